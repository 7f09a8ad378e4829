//! Scan run lifecycle
//!
//! [`ScanRun::setup`] prepares ZAP before the test workers start proxying
//! traffic through it; [`ScanRun::teardown`] runs once they are done. Setup
//! failures abort the run. Teardown never fails: errors are logged, cleanup
//! still runs, and the daemon is still shut down.

use tracing::{error, info, warn};
use zapguard_common::{Result, ScanConfiguration, SecurityScanResult, ZapClient};
use zapguard_daemon::{DaemonOptions, DaemonSupervisor};

use crate::orchestrator::ScanOrchestrator;
use crate::report::{render_summary, ReportPaths};

/// What teardown produced
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub results: Option<SecurityScanResult>,
    pub reports: Option<ReportPaths>,
    /// Rendered summary block
    pub summary: Option<String>,
    /// Error raised while scanning or reporting, if any
    pub error: Option<String>,
}

impl RunOutcome {
    /// True only when results were collected and every threshold held
    pub fn passed(&self) -> bool {
        self.results
            .as_ref()
            .map(|r| r.passed_thresholds)
            .unwrap_or(false)
    }
}

/// One scan run spanning a test session
pub struct ScanRun<'a> {
    config: ScanConfiguration,
    supervisor: &'a mut DaemonSupervisor,
    orchestrator: ScanOrchestrator,
}

impl<'a> ScanRun<'a> {
    /// Validate configuration, make sure a daemon is up, and initialize a session
    pub async fn setup(
        config: ScanConfiguration,
        supervisor: &'a mut DaemonSupervisor,
    ) -> Result<ScanRun<'a>> {
        config.validate()?;

        let mode = config.scan_mode();
        info!("ZAP security scan setup");
        info!("Target URL: {}", config.target_url);
        info!("Scan mode: {}", mode.scan_type.to_string().to_uppercase());
        info!("Workers: {}", mode.workers);
        if config.active_scan {
            warn!("Active scanning enabled. Only scan applications you are authorized to test.");
        }

        let client = if config.external_daemon {
            info!("Using externally managed ZAP daemon at {}", config.proxy.api_url);
            ZapClient::new(config.proxy.clone())?
        } else {
            let daemon = supervisor.get_or_create(DaemonOptions::from_config(&config))?;
            daemon.start().await?;
            daemon.client().clone()
        };

        let mut orchestrator = ScanOrchestrator::new(client, config.clone());
        orchestrator.initialize().await?;

        info!("ZAP security scan setup complete");
        Ok(ScanRun {
            config,
            supervisor,
            orchestrator,
        })
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut ScanOrchestrator {
        &mut self.orchestrator
    }

    pub fn config(&self) -> &ScanConfiguration {
        &self.config
    }

    /// Finish the scan, write reports, clean up and stop the daemon
    pub async fn teardown(mut self) -> RunOutcome {
        info!("ZAP security scan teardown");

        let mut outcome = RunOutcome::default();
        if let Err(e) = self.finish_scan(&mut outcome).await {
            error!("Error during security scan teardown: {}", e);
            outcome.error = Some(e.to_string());
        }

        if let Err(e) = self.orchestrator.cleanup().await {
            warn!("Cleanup failed: {}", e);
        }

        if self.config.external_daemon {
            info!("Leaving externally managed ZAP daemon running");
        } else if !self.config.shutdown_on_teardown {
            info!("Leaving ZAP daemon running (ZAP_SHUTDOWN=false)");
        } else {
            info!("Shutting down ZAP daemon...");
            if let Err(e) = self.supervisor.shutdown().await {
                warn!("Failed to shut down ZAP daemon: {}", e);
            }
        }

        outcome
    }

    async fn finish_scan(&mut self, outcome: &mut RunOutcome) -> Result<()> {
        if self.config.active_scan {
            self.orchestrator.run_active_scan(true).await?;
        }

        let results = self.orchestrator.get_results().await?;
        outcome.summary = Some(render_summary(&results, &self.config.thresholds));

        if results.passed_thresholds {
            info!("Security scan passed");
        } else {
            warn!("Security scan failed: thresholds exceeded");
        }

        // Keep the results even if writing reports fails below
        outcome.results = Some(results);
        if let Some(results) = outcome.results.as_ref() {
            outcome.reports = Some(self.orchestrator.write_reports(results).await?);
        }
        Ok(())
    }
}
