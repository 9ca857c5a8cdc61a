//! In-process metrics.
//!
//! `registry` stores meters as atomics and renders them for the `/metrics`
//! handler. `track` is the request middleware that feeds the recorder.

pub mod registry;
pub mod track;

pub use registry::PrometheusRegistry;
