//! One daemon per run
//!
//! The entry point owns a [`DaemonSupervisor`] and hands it to whatever needs
//! the daemon. The first `get_or_create` builds the manager; later calls
//! return the same one until `shutdown` clears it.

use tracing::debug;
use zapguard_common::Result;

use crate::config::DaemonOptions;
use crate::manager::ZapDaemon;

#[derive(Default)]
pub struct DaemonSupervisor {
    daemon: Option<ZapDaemon>,
}

impl DaemonSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The managed daemon, created from `options` if there is none yet.
    /// Options are ignored when a daemon already exists.
    pub fn get_or_create(&mut self, options: DaemonOptions) -> Result<&mut ZapDaemon> {
        let daemon = match self.daemon.take() {
            Some(existing) => existing,
            None => {
                debug!("Creating ZAP daemon manager for {}", options.api_url());
                ZapDaemon::new(options)?
            }
        };
        Ok(self.daemon.insert(daemon))
    }

    pub fn current(&self) -> Option<&ZapDaemon> {
        self.daemon.as_ref()
    }

    /// Stop the managed daemon, if any, and forget it
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut daemon) = self.daemon.take() {
            daemon.stop().await?;
        }
        Ok(())
    }
}
