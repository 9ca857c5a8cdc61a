//! reqmeter core: bounded-cardinality HTTP metrics recording.
//!
//! This crate maps per-request observations (peer, uri, method, status) onto
//! a stable set of instruments. It owns instrument identity and lifecycle
//! only. Bucket math and exposition belong to whatever [`meter::MeterRegistry`]
//! the recorder is given, and it carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Recording runs on every request, so all fallible paths surface as
//! `ReqMeterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod address;
pub mod cache;
pub mod error;
pub mod key;
pub mod limit;
pub mod meter;
pub mod recorder;

/// Shared result type.
pub use error::{Result, ReqMeterError};
pub use recorder::HttpMetricsRecorder;
