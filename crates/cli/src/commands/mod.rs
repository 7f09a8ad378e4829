//! CLI Commands

pub mod daemon;
pub mod scan;

use anyhow::Result;
use zapguard_common::{ScanConfiguration, ZapClient};
use zapguard_daemon::{DaemonOptions, ZapDaemon};

/// API client for the daemon this configuration points at: the external
/// endpoint when `ZAP_EXTERNAL` is set, otherwise the locally managed one
pub fn client_for(config: &ScanConfiguration) -> Result<ZapClient> {
    if config.external_daemon {
        return Ok(ZapClient::new(config.proxy.clone())?);
    }
    let daemon = ZapDaemon::new(DaemonOptions::from_config(config))?;
    Ok(daemon.client().clone())
}
