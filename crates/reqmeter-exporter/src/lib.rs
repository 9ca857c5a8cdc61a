//! reqmeter exporter library entry.
//!
//! Wires the recording core to an in-process Prometheus registry, a strict
//! YAML config, and an axum router with operational endpoints. It is consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
