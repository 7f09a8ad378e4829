//! ZapGuard Daemon Manager
//!
//! Owns the lifecycle of a locally launched OWASP ZAP: executable
//! resolution, detached launch, liveness wait and shutdown.

pub mod config;
pub mod launcher;
pub mod manager;
pub mod supervisor;

pub use config::DaemonOptions;
pub use launcher::{ExecutableSource, ResolvedExecutable};
pub use manager::{DaemonState, ZapDaemon};
pub use supervisor::DaemonSupervisor;
