//! ZapGuard Common Library
//!
//! Shared types, configuration, polling and the ZAP REST API client used by
//! the daemon manager and the scan orchestrator.

pub mod client;
pub mod config;
pub mod error;
pub mod poll;
pub mod types;

// Re-export commonly used types
pub use client::{PollIntervals, ZapClient};
pub use config::{ProxyEndpoint, ScanConfiguration};
pub use error::{Error, Result};
pub use poll::{poll_until, PollSpec};
pub use types::*;

/// ZapGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
