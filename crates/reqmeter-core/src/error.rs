//! Shared error type across reqmeter crates.

use thiserror::Error;

/// Stable error codes (used in logs and startup diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid configuration.
    BadConfig,
    /// Meter registry rejected a registration.
    Registry,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Registry => "REGISTRY",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ReqMeterError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum ReqMeterError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("registry: {0}")]
    Registry(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ReqMeterError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReqMeterError::BadConfig(_) => ErrorCode::BadConfig,
            ReqMeterError::Registry(_) => ErrorCode::Registry,
            ReqMeterError::Internal(_) => ErrorCode::Internal,
        }
    }
}
