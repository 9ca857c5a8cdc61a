//! Remote address formatting for the `remote.address` tag.

use std::net::SocketAddr;

/// Formats a peer into its tag value. Must be deterministic.
pub type AddressFormatter = fn(&SocketAddr) -> String;

/// Format a socket address as `ip:port`.
///
/// IPv6 addresses are written without brackets (`::1:8080`), matching the
/// host-string form most HTTP stacks report for the peer.
pub fn format_socket_address(addr: &SocketAddr) -> String {
    format!("{}:{}", addr.ip(), addr.port())
}

/// Format only the ip. Inbound peers use ephemeral ports, which would give
/// every connection its own instrument.
pub fn format_ip(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn v4_and_v6() {
        let v4: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(format_socket_address(&v4), "127.0.0.1:8080");
        assert_eq!(format_ip(&v4), "127.0.0.1");

        let v6: SocketAddr = "[::1]:443".parse().unwrap();
        assert_eq!(format_socket_address(&v6), "::1:443");
        assert_eq!(format_ip(&v6), "::1");
    }
}
