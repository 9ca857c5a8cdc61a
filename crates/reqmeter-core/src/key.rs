//! Instrument identity within a metric kind.

/// Composite key over the request dimensions of one observation.
///
/// Two keys are equal only if all four fields are equal, so a key without a
/// status never matches a key carrying one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionKey {
    pub uri: String,
    pub address: String,
    pub method: String,
    pub status: Option<String>,
}

impl DimensionKey {
    pub fn new(uri: &str, address: &str, method: &str, status: Option<&str>) -> Self {
        Self {
            uri: uri.to_string(),
            address: address.to_string(),
            method: method.to_string(),
            status: status.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DimensionKey;

    #[test]
    fn absent_status_is_distinct_from_present() {
        let a = DimensionKey::new("/a", "10.0.0.1:80", "GET", None);
        let b = DimensionKey::new("/a", "10.0.0.1:80", "GET", Some("200"));
        assert_ne!(a, b);
        assert_eq!(a, DimensionKey::new("/a", "10.0.0.1:80", "GET", None));
    }

    #[test]
    fn empty_status_is_not_absent() {
        let a = DimensionKey::new("/a", "h:1", "GET", None);
        let b = DimensionKey::new("/a", "h:1", "GET", Some(""));
        assert_ne!(a, b);
    }
}
