//! Daemon Commands

use anyhow::Result;
use serde::Serialize;
use tracing::debug;
use zapguard_common::{AlertSummary, ScanConfiguration};
use zapguard_daemon::{DaemonOptions, DaemonSupervisor, ZapDaemon};

use super::client_for;
use crate::output::{print_error, print_info, print_item, print_success, print_warning, OutputFormat, TableDisplay};

/// Daemon status for display
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatusDisplay {
    pub api_url: String,
    pub version: String,
    pub passive_queue: u32,
    pub alerts: AlertSummary,
    pub external: bool,
}

impl TableDisplay for DaemonStatusDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["API URL", "Version", "Passive Queue", "High", "Medium", "Low", "Info", "Managed"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.api_url.clone(),
            self.version.clone(),
            self.passive_queue.to_string(),
            self.alerts.high.to_string(),
            self.alerts.medium.to_string(),
            self.alerts.low.to_string(),
            self.alerts.informational.to_string(),
            if self.external { "external" } else { "local" }.to_string(),
        ]
    }
}

/// Launch the daemon and leave it running
pub async fn start(config: &ScanConfiguration) -> Result<()> {
    if config.external_daemon {
        print_warning("ZAP_EXTERNAL=true: the daemon is managed elsewhere, nothing to start");
        return Ok(());
    }

    let mut supervisor = DaemonSupervisor::new();
    let daemon = supervisor.get_or_create(DaemonOptions::from_config(config))?;
    daemon.start().await?;

    let version = daemon.client().version().await?;
    print_success(&format!(
        "ZAP {} running at {}",
        version,
        daemon.client().api_url()
    ));
    if let Some(pid) = daemon.pid() {
        print_info(&format!("PID: {}", pid));
    }
    Ok(())
}

/// Ask a running daemon to shut down
pub async fn stop(config: &ScanConfiguration) -> Result<()> {
    if config.external_daemon {
        print_warning("ZAP_EXTERNAL=true: the daemon is managed elsewhere, not stopping it");
        return Ok(());
    }

    let mut daemon = ZapDaemon::new(DaemonOptions::from_config(config))?;
    if !daemon.is_running().await {
        print_info(&format!("ZAP daemon is not running at {}", daemon.client().api_url()));
        return Ok(());
    }

    daemon.stop().await?;
    print_success("ZAP daemon stopped");
    Ok(())
}

/// Print daemon status. Returns false when the daemon does not answer.
pub async fn status(config: &ScanConfiguration, format: OutputFormat) -> Result<bool> {
    let client = client_for(config)?;
    debug!("Checking ZAP at {}", client.api_url());

    if !client.is_running().await {
        print_error(&format!("ZAP daemon is not responding at {}", client.api_url()));
        return Ok(false);
    }

    let status = DaemonStatusDisplay {
        api_url: client.api_url().to_string(),
        version: client.version().await?,
        passive_queue: client.passive_scan_records_to_scan().await?,
        alerts: client.get_alerts_summary(None).await?,
        external: config.external_daemon,
    };
    print_item(&status, format);
    Ok(true)
}
