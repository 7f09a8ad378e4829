//! ZAP REST API client
//!
//! Thin, stateless wrapper over the ZAP JSON API. Every call carries the API
//! key as the `apikey` query parameter; non-2xx responses become
//! [`Error::Api`]. The client owns nothing beyond the endpoint it was built
//! with, so it is cheap to clone and share between tasks.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ProxyEndpoint;
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollSpec};
use crate::types::{Alert, AlertSummary, ScanStatus, ZapMode};

pub const DEFAULT_PASSIVE_SCAN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SPIDER_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_ACTIVE_SCAN_TIMEOUT: Duration = Duration::from_secs(600);

/// Alerts fetched per page by [`ZapClient::get_all_alerts`]
pub const ALERT_PAGE_SIZE: u32 = 1000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval per bounded wait.
///
/// The passive queue drains quickly and is polled often; active scans run
/// for minutes and are polled slowly to keep load off the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub passive_scan: Duration,
    pub spider: Duration,
    pub active_scan: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            passive_scan: Duration::from_secs(1),
            spider: Duration::from_secs(2),
            active_scan: Duration::from_secs(5),
        }
    }
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextResponse {
    context_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordsToScanResponse {
    records_to_scan: String,
}

#[derive(Deserialize)]
struct ScanResponse {
    scan: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Deserialize)]
struct AlertsResponse {
    alerts: Vec<Alert>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// Client for the ZAP REST API
#[derive(Debug, Clone)]
pub struct ZapClient {
    http: reqwest::Client,
    endpoint: ProxyEndpoint,
    intervals: PollIntervals,
}

impl ZapClient {
    /// Create a new client for the given endpoint
    pub fn new(endpoint: ProxyEndpoint) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint,
            intervals: PollIntervals::default(),
        })
    }

    /// Override the poll intervals used by the bounded waits
    pub fn with_poll_intervals(mut self, intervals: PollIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }

    pub fn api_url(&self) -> &str {
        &self.endpoint.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.api_url.trim_end_matches('/'), path)
    }

    /// Issue an authenticated GET and fail on non-2xx
    async fn send(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.get(self.url(path));

        if !self.endpoint.api_key.is_empty() {
            request = request.query(&[("apikey", self.endpoint.api_key.as_str())]);
        }
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => format!("{} ({})", err.message, err.code),
                Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
            return Err(Error::Api {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(response)
    }

    async fn request<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let response = self.send(path, params, None).await?;
        Ok(response.json().await?)
    }

    /// Actions answer `{"Result":"OK"}`; only the status matters
    async fn action(&self, path: &str, params: &[(&str, &str)]) -> Result<()> {
        self.send(path, params, None).await?;
        Ok(())
    }

    // Core

    /// Check if ZAP is running and accessible. Never fails.
    pub async fn is_running(&self) -> bool {
        match self
            .send("/JSON/core/view/version/", &[], Some(LIVENESS_TIMEOUT))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!("ZAP liveness check failed: {}", e);
                false
            }
        }
    }

    /// Get the ZAP version
    pub async fn version(&self) -> Result<String> {
        let result: VersionResponse = self.request("/JSON/core/view/version/", &[]).await?;
        Ok(result.version)
    }

    /// Create a new session, discarding all prior data
    pub async fn new_session(&self, name: &str, overwrite: bool) -> Result<()> {
        let overwrite = overwrite.to_string();
        self.action(
            "/JSON/core/action/newSession/",
            &[("name", name), ("overwrite", overwrite.as_str())],
        )
        .await
    }

    pub async fn set_mode(&self, mode: ZapMode) -> Result<()> {
        self.action("/JSON/core/action/setMode/", &[("mode", mode.as_str())])
            .await
    }

    /// Ask ZAP to exit
    pub async fn shutdown(&self) -> Result<()> {
        self.action("/JSON/core/action/shutdown/", &[]).await
    }

    // Contexts

    /// Create a context and return its id
    pub async fn create_context(&self, context_name: &str) -> Result<String> {
        let result: ContextResponse = self
            .request(
                "/JSON/context/action/newContext/",
                &[("contextName", context_name)],
            )
            .await?;
        Ok(result.context_id)
    }

    pub async fn include_in_context(&self, context_name: &str, regex: &str) -> Result<()> {
        self.action(
            "/JSON/context/action/includeInContext/",
            &[("contextName", context_name), ("regex", regex)],
        )
        .await
    }

    pub async fn exclude_from_context(&self, context_name: &str, regex: &str) -> Result<()> {
        self.action(
            "/JSON/context/action/excludeFromContext/",
            &[("contextName", context_name), ("regex", regex)],
        )
        .await
    }

    // Passive scanning

    pub async fn set_passive_scan_enabled(&self, enabled: bool) -> Result<()> {
        let enabled = enabled.to_string();
        self.action("/JSON/pscan/action/setEnabled/", &[("enabled", enabled.as_str())])
            .await
    }

    /// Number of records still queued for passive analysis
    pub async fn passive_scan_records_to_scan(&self) -> Result<u32> {
        let result: RecordsToScanResponse =
            self.request("/JSON/pscan/view/recordsToScan/", &[]).await?;
        parse_number("recordsToScan", &result.records_to_scan)
    }

    /// Wait until the passive scan queue is empty
    pub async fn wait_for_passive_scan(&self, timeout: Duration) -> Result<()> {
        poll_until(
            "Passive scan",
            PollSpec::new(self.intervals.passive_scan, timeout),
            move || async move {
                let remaining = self.passive_scan_records_to_scan().await?;
                debug!("Passive scan records remaining: {}", remaining);
                Ok::<_, Error>(remaining)
            },
            |remaining| *remaining == 0,
            None,
        )
        .await?;
        Ok(())
    }

    // Spider

    /// Start crawling from `url`, optionally limited to a context. Returns the scan id.
    pub async fn start_spider(&self, url: &str, context_name: Option<&str>) -> Result<String> {
        let mut params = vec![("url", url)];
        if let Some(context_name) = context_name {
            params.push(("contextName", context_name));
        }
        let result: ScanResponse = self.request("/JSON/spider/action/scan/", &params).await?;
        Ok(result.scan)
    }

    /// Spider progress, 0-100
    pub async fn spider_status(&self, scan_id: &str) -> Result<u32> {
        let result: StatusResponse = self
            .request("/JSON/spider/view/status/", &[("scanId", scan_id)])
            .await?;
        parse_number("status", &result.status)
    }

    pub async fn wait_for_spider(&self, scan_id: &str, timeout: Duration) -> Result<()> {
        poll_until(
            "Spider scan",
            PollSpec::new(self.intervals.spider, timeout),
            || self.spider_status(scan_id),
            |progress| *progress >= 100,
            None,
        )
        .await?;
        Ok(())
    }

    // Active scanning

    /// Start an active scan against `url`, optionally scoped to a context id.
    ///
    /// Sends attack payloads to the target. Callers must hold the
    /// single-worker guarantee before calling this.
    pub async fn start_active_scan(&self, url: &str, context_id: Option<&str>) -> Result<String> {
        let mut params = vec![("url", url)];
        if let Some(context_id) = context_id {
            params.push(("contextId", context_id));
        }
        let result: ScanResponse = self.request("/JSON/ascan/action/scan/", &params).await?;
        Ok(result.scan)
    }

    pub async fn active_scan_status(&self, scan_id: &str) -> Result<ScanStatus> {
        let result: StatusResponse = self
            .request("/JSON/ascan/view/status/", &[("scanId", scan_id)])
            .await?;
        Ok(ScanStatus::from_progress(parse_number("status", &result.status)?))
    }

    /// Wait for an active scan, reporting progress after every poll
    pub async fn wait_for_active_scan(
        &self,
        scan_id: &str,
        timeout: Duration,
        on_progress: Option<&mut (dyn FnMut(&ScanStatus) + Send)>,
    ) -> Result<()> {
        poll_until(
            "Active scan",
            PollSpec::new(self.intervals.active_scan, timeout),
            || self.active_scan_status(scan_id),
            ScanStatus::is_finished,
            on_progress,
        )
        .await?;
        Ok(())
    }

    pub async fn stop_active_scan(&self, scan_id: &str) -> Result<()> {
        self.action("/JSON/ascan/action/stop/", &[("scanId", scan_id)])
            .await
    }

    // Alerts

    /// Fetch one page of alerts, optionally filtered to URLs under `base_url`
    pub async fn get_alerts(&self, base_url: Option<&str>, start: u32, count: u32) -> Result<Vec<Alert>> {
        let start = start.to_string();
        let count = count.to_string();
        let mut params = vec![("start", start.as_str()), ("count", count.as_str())];
        if let Some(base_url) = base_url {
            params.push(("baseurl", base_url));
        }
        let result: AlertsResponse = self.request("/JSON/core/view/alerts/", &params).await?;
        Ok(result.alerts)
    }

    /// Fetch every alert, page by page
    pub async fn get_all_alerts(&self, base_url: Option<&str>) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        loop {
            let offset = alerts.len() as u32;
            let page = self.get_alerts(base_url, offset, ALERT_PAGE_SIZE).await?;
            let short_page = (page.len() as u32) < ALERT_PAGE_SIZE;
            alerts.extend(page);
            if short_page {
                break;
            }
        }
        debug!("Fetched {} alert(s)", alerts.len());
        Ok(alerts)
    }

    /// Fetch every alert and count them per risk level
    pub async fn get_alerts_summary(&self, base_url: Option<&str>) -> Result<AlertSummary> {
        let alerts = self.get_all_alerts(base_url).await?;
        Ok(AlertSummary::from_alerts(&alerts))
    }

    pub async fn delete_all_alerts(&self) -> Result<()> {
        warn!("Deleting all ZAP alerts");
        self.action("/JSON/core/action/deleteAllAlerts/", &[]).await
    }

    // Reports

    /// Pre-rendered HTML report body
    pub async fn html_report(&self) -> Result<String> {
        let response = self.send("/OTHER/core/other/htmlreport/", &[], None).await?;
        Ok(response.text().await?)
    }

    /// Pre-rendered JSON report body, returned verbatim
    pub async fn json_report(&self) -> Result<String> {
        let response = self.send("/OTHER/core/other/jsonreport/", &[], None).await?;
        Ok(response.text().await?)
    }
}

/// ZAP encodes numbers as JSON strings
fn parse_number(field: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidResponse(format!("{} is not a number: '{}'", field, raw)))
}
