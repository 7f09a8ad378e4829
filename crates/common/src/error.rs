//! Error types for ZapGuard

use std::time::Duration;
use thiserror::Error;

/// Result type alias using ZapGuard Error
pub type Result<T> = std::result::Result<T, Error>;

/// ZapGuard error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("SECURITY VIOLATION: {0}")]
    SecurityViolation(String),

    #[error("ZAP daemon is not running at {0}")]
    DaemonNotRunning(String),

    #[error("ZAP daemon failed to start within {timeout:?}")]
    DaemonStartup { timeout: Duration },

    #[error("Failed to launch ZAP daemon: {0}")]
    DaemonLaunch(String),

    #[error("{operation} timeout exceeded after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("ZAP API error: {status} {reason}")]
    Api { status: u16, reason: String },

    #[error("Invalid ZAP API response: {0}")]
    InvalidResponse(String),

    #[error("Invalid orchestrator state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Security thresholds exceeded:\n{0}")]
    ThresholdsExceeded(String),
}

impl Error {
    /// True for errors raised by a bounded wait running out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::DaemonStartup { .. })
    }
}
