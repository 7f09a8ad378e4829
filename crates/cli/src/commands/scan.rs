//! Scan Commands

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::warn;
use zapguard_common::{Alert, AlertSummary, ScanConfiguration};
use zapguard_daemon::DaemonSupervisor;
use zapguard_scan::{assert_within_thresholds, ScanRun};

use super::client_for;
use crate::output::{print_error, print_info, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Tear down right after setup instead of waiting for Ctrl-C
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Args)]
pub struct AlertsArgs {
    /// Include alerts for every site, not just TARGET_URL
    #[arg(long)]
    pub all: bool,

    /// Exit non-zero when alert counts exceed the configured thresholds
    #[arg(long)]
    pub check: bool,
}

/// Alert for display
#[derive(Debug, Serialize)]
pub struct AlertDisplay {
    pub risk: String,
    pub confidence: String,
    pub name: String,
    pub url: String,
    pub param: String,
    pub cwe: String,
}

impl From<&Alert> for AlertDisplay {
    fn from(alert: &Alert) -> Self {
        Self {
            risk: alert.risk.to_string(),
            confidence: format!("{:?}", alert.confidence),
            name: alert.name.clone(),
            url: alert.url.clone(),
            param: alert.param.clone(),
            cwe: alert.cwe_id.clone(),
        }
    }
}

impl TableDisplay for AlertDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Risk", "Confidence", "Alert", "URL", "Param", "CWE"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.risk.clone(),
            self.confidence.clone(),
            self.name.clone(),
            self.url.clone(),
            self.param.clone(),
            self.cwe.clone(),
        ]
    }
}

/// Set up a scan session, wait for the test run, then tear down and report.
/// Returns whether every threshold held.
pub async fn run(args: RunArgs, config: ScanConfiguration) -> Result<bool> {
    let proxy = format!("{}:{}", config.proxy.proxy_host, config.proxy.proxy_port);
    let mut supervisor = DaemonSupervisor::new();

    let setup_error = match ScanRun::setup(config, &mut supervisor).await {
        Ok(run) => return finish(args, run, &proxy).await,
        Err(e) => e,
    };

    if let Err(stop_err) = supervisor.shutdown().await {
        warn!("Failed to stop ZAP daemon after setup error: {}", stop_err);
    }
    Err(setup_error.into())
}

async fn finish(args: RunArgs, run: ScanRun<'_>, proxy: &str) -> Result<bool> {
    print_success(&format!("ZAP is ready. Route test traffic through proxy {}", proxy));
    if !args.no_wait {
        print_info("Press Ctrl-C when the test session has finished");
        tokio::signal::ctrl_c().await?;
        println!();
    }

    let outcome = run.teardown().await;

    if let Some(summary) = &outcome.summary {
        println!("{}", summary);
    }
    if let Some(reports) = &outcome.reports {
        print_info(&format!("HTML report: {}", reports.html.display()));
        print_info(&format!("JSON report: {}", reports.json.display()));
        print_info(&format!("Scan summary: {}", reports.summary.display()));
    }
    if let Some(error) = &outcome.error {
        print_error(error);
    }

    let passed = outcome.passed();
    if passed {
        println!("{}", "SECURITY SCAN PASSED".green().bold());
    } else {
        println!("{}", "SECURITY SCAN FAILED".red().bold());
    }
    Ok(passed)
}

/// List alerts and optionally gate on thresholds. Returns false when the gate fails.
pub async fn alerts(args: AlertsArgs, config: &ScanConfiguration, format: OutputFormat) -> Result<bool> {
    let client = client_for(config)?;
    let base_url = if args.all {
        None
    } else {
        Some(config.target_url.as_str())
    };

    let alerts = client.get_all_alerts(base_url).await?;
    let rows: Vec<AlertDisplay> = alerts.iter().map(AlertDisplay::from).collect();
    print_list(&rows, format);

    if !args.check {
        return Ok(true);
    }

    let summary = AlertSummary::from_alerts(&alerts);
    match assert_within_thresholds(&summary, &config.thresholds) {
        Ok(()) => {
            print_success(&format!("{} alert(s) within thresholds", summary.total));
            Ok(true)
        }
        Err(e) => {
            print_error(&e.to_string());
            Ok(false)
        }
    }
}
