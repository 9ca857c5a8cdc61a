//! Shared application state for the reqmeter exporter.
//!
//! Owns the meter registry and the recorder built on top of it. The recorder's
//! instrument cache lives exactly as long as this state; there is no process
//! global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqmeter_core::limit::MaxUriTags;
use reqmeter_core::HttpMetricsRecorder;

use crate::config::ExporterConfig;
use crate::obs::PrometheusRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<PrometheusRegistry>,
    recorder: Arc<HttpMetricsRecorder>,
}

struct AppStateInner {
    draining: AtomicBool,
}

impl AppState {
    pub fn new(cfg: ExporterConfig) -> Self {
        let registry = Arc::new(PrometheusRegistry::new());
        let policy = MaxUriTags::new(
            cfg.metrics.max_uri_tags,
            cfg.metrics.uri_tag_scope.into(),
            cfg.metrics.overflow_uri.clone(),
        );
        let recorder = HttpMetricsRecorder::new(
            cfg.metrics.prefix.clone(),
            registry.clone(),
            Arc::new(policy),
        )
        .with_address_formatter(cfg.metrics.remote_address.formatter());

        tracing::info!(
            prefix = %cfg.metrics.prefix,
            max_uri_tags = cfg.metrics.max_uri_tags,
            scope = ?cfg.metrics.uri_tag_scope,
            remote_address = ?cfg.metrics.remote_address,
            "metrics recorder ready"
        );

        Self {
            inner: Arc::new(AppStateInner {
                draining: AtomicBool::new(false),
            }),
            registry,
            recorder: Arc::new(recorder),
        }
    }

    pub fn registry(&self) -> Arc<PrometheusRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn recorder(&self) -> Arc<HttpMetricsRecorder> {
        Arc::clone(&self.recorder)
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
