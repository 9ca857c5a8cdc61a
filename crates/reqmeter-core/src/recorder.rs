//! HTTP metrics recorder.
//!
//! Turns per-request observations into samples on a bounded set of
//! instruments. Every operation follows the same path: format the peer,
//! cap the uri through the [`UriTagPolicy`], build the [`DimensionKey`], then
//! get-or-create the instrument in the kind's cache and record.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::address::{format_socket_address, AddressFormatter};
use crate::cache::InstrumentCache;
use crate::error::Result;
use crate::key::DimensionKey;
use crate::limit::UriTagPolicy;
use crate::meter::{MeterId, MeterRegistry, MetricKind, METHOD, REMOTE_ADDRESS, STATUS, URI};

/// Records HTTP timings, byte counts and errors, one instrument per dimension tuple.
pub struct HttpMetricsRecorder {
    prefix: String,
    registry: Arc<dyn MeterRegistry>,
    uri_policy: Arc<dyn UriTagPolicy>,
    format_address: AddressFormatter,
    cache: InstrumentCache,
}

impl HttpMetricsRecorder {
    /// `prefix` is prepended to every meter name, e.g. `http.client`.
    pub fn new(
        prefix: impl Into<String>,
        registry: Arc<dyn MeterRegistry>,
        uri_policy: Arc<dyn UriTagPolicy>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
            uri_policy,
            format_address: format_socket_address,
            cache: InstrumentCache::new(),
        }
    }

    /// Replace the peer formatter (defaults to `ip:port`).
    pub fn with_address_formatter(mut self, format_address: AddressFormatter) -> Self {
        self.format_address = format_address;
        self
    }

    pub fn cache(&self) -> &InstrumentCache {
        &self.cache
    }

    pub fn record_data_received_time(
        &self,
        remote_address: &SocketAddr,
        uri: &str,
        method: &str,
        status: &str,
        time: Duration,
    ) -> Result<()> {
        self.record_timer(
            MetricKind::DataReceivedTime,
            remote_address,
            uri,
            method,
            Some(status),
            time,
        )
    }

    /// Data-sent time is taken before a response exists, so it has no status dimension.
    pub fn record_data_sent_time(
        &self,
        remote_address: &SocketAddr,
        uri: &str,
        method: &str,
        time: Duration,
    ) -> Result<()> {
        self.record_timer(MetricKind::DataSentTime, remote_address, uri, method, None, time)
    }

    pub fn record_response_time(
        &self,
        remote_address: &SocketAddr,
        uri: &str,
        method: &str,
        status: &str,
        time: Duration,
    ) -> Result<()> {
        self.record_timer(
            MetricKind::ResponseTime,
            remote_address,
            uri,
            method,
            Some(status),
            time,
        )
    }

    pub fn record_data_received(
        &self,
        remote_address: &SocketAddr,
        uri: &str,
        bytes: u64,
    ) -> Result<()> {
        self.record_bytes(MetricKind::DataReceived, remote_address, uri, bytes)
    }

    pub fn record_data_sent(
        &self,
        remote_address: &SocketAddr,
        uri: &str,
        bytes: u64,
    ) -> Result<()> {
        self.record_bytes(MetricKind::DataSent, remote_address, uri, bytes)
    }

    pub fn increment_errors_count(&self, remote_address: &SocketAddr, uri: &str) -> Result<()> {
        let address = (self.format_address)(remote_address);
        let uri = self.uri_policy.limit(MetricKind::Errors, uri);
        let key = DimensionKey::new(&uri, &address, "", None);
        let counter = self.cache.counter(key, |k| {
            let id = MeterId::for_kind(
                &self.prefix,
                MetricKind::Errors,
                &[(REMOTE_ADDRESS, k.address.as_str()), (URI, k.uri.as_str())],
            );
            tracing::debug!(
                meter = %id.name,
                uri = %k.uri,
                address = %k.address,
                "registering counter"
            );
            self.registry.counter(&id)
        })?;
        counter.increment();
        Ok(())
    }

    fn record_timer(
        &self,
        kind: MetricKind,
        remote_address: &SocketAddr,
        uri: &str,
        method: &str,
        status: Option<&str>,
        time: Duration,
    ) -> Result<()> {
        let address = (self.format_address)(remote_address);
        let uri = self.uri_policy.limit(kind, uri);
        let key = DimensionKey::new(&uri, &address, method, status);
        let timer = self.cache.timer(kind, key, |k| {
            let mut tags = vec![
                (REMOTE_ADDRESS, k.address.as_str()),
                (URI, k.uri.as_str()),
                (METHOD, k.method.as_str()),
            ];
            if let Some(status) = &k.status {
                tags.push((STATUS, status.as_str()));
            }
            let id = MeterId::for_kind(&self.prefix, kind, &tags);
            tracing::debug!(
                meter = %id.name,
                uri = %k.uri,
                address = %k.address,
                "registering timer"
            );
            self.registry.timer(&id)
        })?;
        timer.record(time);
        Ok(())
    }

    fn record_bytes(
        &self,
        kind: MetricKind,
        remote_address: &SocketAddr,
        uri: &str,
        bytes: u64,
    ) -> Result<()> {
        let address = (self.format_address)(remote_address);
        let uri = self.uri_policy.limit(kind, uri);
        let key = DimensionKey::new(&uri, &address, "", None);
        let summary = self.cache.summary(kind, key, |k| {
            let id = MeterId::for_kind(
                &self.prefix,
                kind,
                &[(REMOTE_ADDRESS, k.address.as_str()), (URI, k.uri.as_str())],
            );
            tracing::debug!(
                meter = %id.name,
                uri = %k.uri,
                address = %k.address,
                "registering summary"
            );
            self.registry.summary(&id)
        })?;
        summary.record(bytes);
        Ok(())
    }
}
