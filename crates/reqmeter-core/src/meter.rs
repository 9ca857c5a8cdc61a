//! Meter contracts between the recorder and a meter registry.
//!
//! The recorder never does bucket or percentile math itself. It asks a
//! [`MeterRegistry`] for an instrument once per dimension tuple and then only
//! pushes samples into it.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub const REMOTE_ADDRESS: &str = "remote.address";
pub const URI: &str = "uri";
pub const METHOD: &str = "method";
pub const STATUS: &str = "status";

/// Records duration samples.
pub trait Timer: Send + Sync {
    fn record(&self, duration: Duration);
}

/// Records amount samples (bytes).
pub trait DistributionSummary: Send + Sync {
    fn record(&self, amount: u64);
}

/// Monotonic counter.
pub trait Counter: Send + Sync {
    fn increment(&self);
}

/// The instrument kinds a recorder maintains. Each kind owns its own cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    DataReceivedTime,
    DataSentTime,
    ResponseTime,
    DataReceived,
    DataSent,
    Errors,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::DataReceivedTime,
        MetricKind::DataSentTime,
        MetricKind::ResponseTime,
        MetricKind::DataReceived,
        MetricKind::DataSent,
        MetricKind::Errors,
    ];

    /// Name suffix appended to the recorder prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricKind::DataReceivedTime => "data.received.time",
            MetricKind::DataSentTime => "data.sent.time",
            MetricKind::ResponseTime => "response.time",
            MetricKind::DataReceived => "data.received",
            MetricKind::DataSent => "data.sent",
            MetricKind::Errors => "errors",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::DataReceivedTime => "Time spent in consuming incoming data",
            MetricKind::DataSentTime => "Time spent in sending outgoing data",
            MetricKind::ResponseTime => "Total time for the request/response",
            MetricKind::DataReceived => "Amount of the data received, in bytes",
            MetricKind::DataSent => "Amount of the data sent, in bytes",
            MetricKind::Errors => "Number of errors that occurred",
        }
    }

    pub fn base_unit(self) -> Option<&'static str> {
        match self {
            MetricKind::DataReceived | MetricKind::DataSent => Some("bytes"),
            _ => None,
        }
    }
}

/// Registry identity of one instrument: name plus sorted tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeterId {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub description: &'static str,
    pub base_unit: Option<&'static str>,
}

impl MeterId {
    pub fn new(name: impl Into<String>, tags: &[(&str, &str)]) -> Self {
        let mut tags: Vec<(String, String)> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        tags.sort();
        Self {
            name: name.into(),
            tags,
            description: "",
            base_unit: None,
        }
    }

    /// Build the id for `kind` under `prefix`, carrying kind metadata.
    pub fn for_kind(prefix: &str, kind: MetricKind, tags: &[(&str, &str)]) -> Self {
        let mut id = Self::new(format!("{prefix}.{}", kind.suffix()), tags);
        id.description = kind.description();
        id.base_unit = kind.base_unit();
        id
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Source of instruments. Implementations may return a shared instance for an
/// id they already know.
pub trait MeterRegistry: Send + Sync {
    fn timer(&self, id: &MeterId) -> Result<Arc<dyn Timer>>;
    fn summary(&self, id: &MeterId) -> Result<Arc<dyn DistributionSummary>>;
    fn counter(&self, id: &MeterId) -> Result<Arc<dyn Counter>>;
}
