//! Scan orchestration against a running ZAP daemon
//!
//! Drives one scan session: session and context setup, passive scan
//! draining, the optional spider plus active scan, result collection and
//! report generation. Daemon start/stop lives in `zapguard-daemon`; this
//! module only talks to the API.

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zapguard_common::client::{
    DEFAULT_ACTIVE_SCAN_TIMEOUT, DEFAULT_PASSIVE_SCAN_TIMEOUT, DEFAULT_SPIDER_TIMEOUT,
};
use zapguard_common::{
    AlertSummary, Error, Result, ScanConfiguration, ScanMode, ScanStatus, ScanThresholds,
    SecurityScanResult, ZapClient, ZapMode,
};

use crate::report::{self, ReportPaths, ReportWriter};

/// Context created for every session
pub const DEFAULT_CONTEXT_NAME: &str = "security-test";

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    Initialized,
    Scanned,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorState::Uninitialized => write!(f, "uninitialized"),
            OrchestratorState::Initialized => write!(f, "initialized"),
            OrchestratorState::Scanned => write!(f, "scanned"),
        }
    }
}

/// Upper bounds for the orchestrator's waits
#[derive(Debug, Clone, Copy)]
pub struct ScanTimeouts {
    pub passive_scan: Duration,
    pub spider: Duration,
    pub active_scan: Duration,
}

impl Default for ScanTimeouts {
    fn default() -> Self {
        Self {
            passive_scan: DEFAULT_PASSIVE_SCAN_TIMEOUT,
            spider: DEFAULT_SPIDER_TIMEOUT,
            active_scan: DEFAULT_ACTIVE_SCAN_TIMEOUT,
        }
    }
}

/// Characters escaped in a target URL before it is registered as a context pattern
const REGEX_METACHARACTERS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Context include pattern for `target_url`: the URL with regex
/// metacharacters backslash-escaped, followed by `.*`
pub fn context_pattern(target_url: &str) -> String {
    let mut pattern = String::with_capacity(target_url.len() + 8);
    for c in target_url.chars() {
        if REGEX_METACHARACTERS.contains(&c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push_str(".*");
    pattern
}

/// Runs one scan session for a single target
pub struct ScanOrchestrator {
    client: ZapClient,
    config: ScanConfiguration,
    target_url: String,
    context_name: String,
    context_id: Option<String>,
    state: OrchestratorState,
    started_at: Option<Instant>,
    timeouts: ScanTimeouts,
}

impl ScanOrchestrator {
    /// Orchestrator for `config.target_url`. Nothing is sent until [`initialize`](Self::initialize).
    pub fn new(client: ZapClient, config: ScanConfiguration) -> Self {
        let target_url = config.target_url.clone();
        Self {
            client,
            config,
            target_url,
            context_name: DEFAULT_CONTEXT_NAME.to_string(),
            context_id: None,
            state: OrchestratorState::Uninitialized,
            started_at: None,
            timeouts: ScanTimeouts::default(),
        }
    }

    pub fn with_context_name(mut self, name: impl Into<String>) -> Self {
        self.context_name = name.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: ScanTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn client(&self) -> &ZapClient {
        &self.client
    }

    pub fn config(&self) -> &ScanConfiguration {
        &self.config
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// Context id assigned by ZAP during initialization
    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn timeouts(&self) -> ScanTimeouts {
        self.timeouts
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.config.scan_mode()
    }

    /// Include pattern for the scan context
    pub fn context_regex(&self) -> String {
        context_pattern(&self.target_url)
    }

    /// Start a fresh session scoped to the target
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing ZAP security scan session...");
        self.started_at = Some(Instant::now());

        if !self.client.is_running().await {
            return Err(Error::DaemonNotRunning(self.client.api_url().to_string()));
        }

        let version = self.client.version().await?;
        info!("Connected to ZAP {}", version);

        let session_name = format!("security-{}", Utc::now().timestamp_millis());
        self.client.new_session(&session_name, true).await?;
        debug!("Created session {}", session_name);

        let context_id = self.client.create_context(&self.context_name).await?;
        let pattern = self.context_regex();
        self.client
            .include_in_context(&self.context_name, &pattern)
            .await?;
        info!(
            "Created context '{}' (id {}) including {}",
            self.context_name, context_id, pattern
        );
        self.context_id = Some(context_id);

        let mode = if self.config.active_scan {
            ZapMode::Attack
        } else {
            ZapMode::Standard
        };
        self.client.set_mode(mode).await?;
        info!("ZAP mode set to {}", mode);

        self.client.set_passive_scan_enabled(true).await?;
        info!("Passive scanning enabled");

        self.state = OrchestratorState::Initialized;
        Ok(())
    }

    /// Block until ZAP's passive scan queue is empty
    pub async fn wait_for_passive_scan(&self, timeout: Duration) -> Result<()> {
        info!("Waiting for passive scan to complete...");
        self.client.wait_for_passive_scan(timeout).await?;
        info!("Passive scan complete");
        Ok(())
    }

    /// Spider (optionally) and actively attack the target.
    ///
    /// Refused with a security violation unless exactly one worker shares
    /// the daemon; no request is sent in that case.
    pub async fn run_active_scan(&mut self, spider_first: bool) -> Result<()> {
        let mode = self.scan_mode();
        if !mode.permits_active_scan() {
            return Err(Error::SecurityViolation(format!(
                "Active scan attempted with {} workers. Active scans must run with a single worker (PW_WORKERS=1).",
                mode.workers
            )));
        }

        if self.state == OrchestratorState::Uninitialized {
            return Err(Error::InvalidState {
                expected: OrchestratorState::Initialized.to_string(),
                actual: self.state.to_string(),
            });
        }

        warn!("Starting ACTIVE scan of {}. Attack payloads will be sent.", self.target_url);

        if spider_first {
            info!("Spidering {}...", self.target_url);
            let spider_id = self
                .client
                .start_spider(&self.target_url, Some(&self.context_name))
                .await?;
            self.client
                .wait_for_spider(&spider_id, self.timeouts.spider)
                .await?;
            info!("Spider complete");
        }

        let scan_id = self
            .client
            .start_active_scan(&self.target_url, self.context_id.as_deref())
            .await?;
        debug!("Active scan started with id {}", scan_id);

        let mut log_progress = |status: &ScanStatus| info!("Active scan progress: {}%", status.progress);
        let progress: &mut (dyn FnMut(&ScanStatus) + Send) = &mut log_progress;
        let waited = self
            .client
            .wait_for_active_scan(&scan_id, self.timeouts.active_scan, Some(progress))
            .await;

        if let Err(e) = waited {
            if e.is_timeout() {
                warn!("Active scan did not finish in time, stopping scan {}", scan_id);
                if let Err(stop_err) = self.client.stop_active_scan(&scan_id).await {
                    warn!("Failed to stop active scan {}: {}", scan_id, stop_err);
                }
            }
            return Err(e);
        }

        info!("Active scan complete");
        self.state = OrchestratorState::Scanned;
        Ok(())
    }

    /// Drain the passive queue and collect every alert under the target
    pub async fn get_results(&self) -> Result<SecurityScanResult> {
        let fallback_start = Instant::now();
        self.wait_for_passive_scan(self.timeouts.passive_scan)
            .await?;

        let alerts = self.client.get_all_alerts(Some(&self.target_url)).await?;
        let summary = AlertSummary::from_alerts(&alerts);
        let passed_thresholds = self.config.thresholds.passes(&summary);
        let duration_ms = self.started_at.unwrap_or(fallback_start).elapsed().as_millis() as u64;

        info!(
            "Collected {} alert(s) for {} (high: {}, medium: {}, low: {}, informational: {})",
            summary.total,
            self.target_url,
            summary.high,
            summary.medium,
            summary.low,
            summary.informational
        );

        Ok(SecurityScanResult {
            scan_mode: self.scan_mode(),
            target_url: self.target_url.clone(),
            duration_ms,
            alerts,
            summary,
            passed_thresholds,
        })
    }

    /// Fetch ZAP's reports and write them with a fresh scan summary
    pub async fn generate_reports(&self) -> Result<ReportPaths> {
        let results = self.get_results().await?;
        self.write_reports(&results).await
    }

    /// Fetch ZAP's HTML and JSON reports and write them next to `results`
    pub async fn write_reports(&self, results: &SecurityScanResult) -> Result<ReportPaths> {
        let html = self.client.html_report().await?;
        let json = self.client.json_report().await?;

        let paths = ReportWriter::new(&self.config.report_dir).write(&html, &json, results)?;
        info!("HTML report: {}", paths.html.display());
        info!("JSON report: {}", paths.json.display());
        info!("Scan summary: {}", paths.summary.display());
        Ok(paths)
    }

    /// Fail with a readable report when the current alert counts exceed
    /// `thresholds` (the configured ones when `None`)
    pub async fn assert_alerts_within_thresholds(
        &self,
        thresholds: Option<ScanThresholds>,
    ) -> Result<AlertSummary> {
        let thresholds = thresholds.unwrap_or(self.config.thresholds);
        self.wait_for_passive_scan(self.timeouts.passive_scan)
            .await?;
        let summary = self.client.get_alerts_summary(Some(&self.target_url)).await?;
        report::assert_within_thresholds(&summary, &thresholds)?;
        Ok(summary)
    }

    /// End-of-session housekeeping. Server-side alerts are only deleted when
    /// `clear_alerts_on_cleanup` is set.
    pub async fn cleanup(&self) -> Result<()> {
        if self.config.clear_alerts_on_cleanup {
            info!("Clearing ZAP alerts");
            self.client.delete_all_alerts().await?;
        } else {
            debug!("Keeping ZAP alerts for inspection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_context_pattern_escapes_metacharacters() {
        assert_eq!(context_pattern("https://example.com"), "https://example\\.com.*");
        assert_eq!(
            context_pattern("https://shop.example.com/search?q=(a|b)"),
            "https://shop\\.example\\.com/search\\?q=\\(a\\|b\\).*"
        );
    }

    #[test]
    fn test_context_pattern_keeps_plain_punctuation() {
        assert_eq!(
            context_pattern("https://my-site.com/a#b&c~d"),
            "https://my-site\\.com/a#b&c~d.*"
        );
    }

    #[test]
    fn test_context_pattern_matches_only_the_target() {
        let pattern = Regex::new(&format!("^{}$", context_pattern("https://my-site.com"))).unwrap();

        assert!(pattern.is_match("https://my-site.com"));
        assert!(pattern.is_match("https://my-site.com/cart?id=1"));
        assert!(!pattern.is_match("https://my-siteXcom/"));
        assert!(!pattern.is_match("http://my-site.com/"));
    }
}
