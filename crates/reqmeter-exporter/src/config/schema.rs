use std::net::SocketAddr;

use serde::Deserialize;

use reqmeter_core::address::{format_ip, format_socket_address, AddressFormatter};
use reqmeter_core::error::{ReqMeterError, Result};
use reqmeter_core::limit::{UriTagScope, DEFAULT_MAX_URI_TAGS, DEFAULT_OVERFLOW_URI};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ReqMeterError::BadConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        self.exporter.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            ReqMeterError::BadConfig(format!(
                "exporter.listen must be a valid SocketAddr: {}",
                self.listen
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UriTagScopeConfig {
    #[default]
    PerMetric,
    Global,
}

impl From<UriTagScopeConfig> for UriTagScope {
    fn from(v: UriTagScopeConfig) -> Self {
        match v {
            UriTagScopeConfig::PerMetric => UriTagScope::PerMetric,
            UriTagScopeConfig::Global => UriTagScope::Global,
        }
    }
}

/// How the peer is written into the `remote.address` tag.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoteAddressFormat {
    #[default]
    Ip,
    IpPort,
}

impl RemoteAddressFormat {
    pub fn formatter(self) -> AddressFormatter {
        match self {
            RemoteAddressFormat::Ip => format_ip,
            RemoteAddressFormat::IpPort => format_socket_address,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_max_uri_tags")]
    pub max_uri_tags: usize,

    #[serde(default)]
    pub uri_tag_scope: UriTagScopeConfig,

    #[serde(default = "default_overflow_uri")]
    pub overflow_uri: String,

    #[serde(default)]
    pub remote_address: RemoteAddressFormat,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            max_uri_tags: default_max_uri_tags(),
            uri_tag_scope: UriTagScopeConfig::default(),
            overflow_uri: default_overflow_uri(),
            remote_address: RemoteAddressFormat::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(ReqMeterError::BadConfig("metrics.prefix must not be empty".into()));
        }
        if !(1..=100_000).contains(&self.max_uri_tags) {
            return Err(ReqMeterError::BadConfig(
                "metrics.max_uri_tags must be between 1 and 100000".into(),
            ));
        }
        if self.overflow_uri.is_empty() {
            return Err(ReqMeterError::BadConfig(
                "metrics.overflow_uri must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}
fn default_prefix() -> String {
    "http.server".into()
}
fn default_max_uri_tags() -> usize {
    DEFAULT_MAX_URI_TAGS
}
fn default_overflow_uri() -> String {
    DEFAULT_OVERFLOW_URI.into()
}
