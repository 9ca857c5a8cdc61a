//! Top-level facade crate for reqmeter.
//!
//! Re-exports the recording core and the exporter so users can depend on a single crate.

pub mod core {
    pub use reqmeter_core::*;
}

pub mod exporter {
    pub use reqmeter_exporter::*;
}
