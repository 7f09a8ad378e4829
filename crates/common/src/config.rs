//! Scan configuration
//!
//! Everything a scan run needs is resolved once from named environment
//! inputs. Resolution goes through a key lookup so it can be exercised without
//! touching the process environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::{ScanMode, ScanThresholds, ScanType};

pub const DEFAULT_PROXY_HOST: &str = "localhost";
pub const DEFAULT_PROXY_PORT: u16 = 8080;
pub const DEFAULT_TARGET_URL: &str = "https://www.amazon.in";
pub const DEFAULT_REPORT_DIR: &str = "reports";

/// Where the ZAP API lives and how to authenticate against it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    /// API base URL (default: http://{proxy_host}:{proxy_port})
    pub api_url: String,

    /// API key sent as the `apikey` query parameter
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Host test traffic is proxied through
    pub proxy_host: String,

    /// Port test traffic is proxied through
    pub proxy_port: u16,
}

impl ProxyEndpoint {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
            proxy_port: DEFAULT_PROXY_PORT,
        }
    }
}

impl Default for ProxyEndpoint {
    fn default() -> Self {
        Self::new(
            format!("http://{}:{}", DEFAULT_PROXY_HOST, DEFAULT_PROXY_PORT),
            "",
        )
    }
}

/// Resolved configuration for one scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfiguration {
    /// ZAP API endpoint
    pub proxy: ProxyEndpoint,

    /// Send attack payloads after the test run
    pub active_scan: bool,

    /// Number of test workers sharing the daemon
    pub workers: u32,

    /// Per-severity alert maxima
    pub thresholds: ScanThresholds,

    /// Application under test
    pub target_url: String,

    /// Daemon lifecycle is owned by someone else (Docker, CI service)
    pub external_daemon: bool,

    /// Stop the daemon during teardown
    pub shutdown_on_teardown: bool,

    /// Explicit daemon executable (`ZAP_PATH`)
    pub zap_path: Option<PathBuf>,

    /// Probe well-known install locations when no explicit path is set
    pub probe_install_paths: bool,

    /// Delete server-side alerts during cleanup
    pub clear_alerts_on_cleanup: bool,

    /// Directory reports are written to
    pub report_dir: PathBuf,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            proxy: ProxyEndpoint::default(),
            active_scan: false,
            workers: 1,
            thresholds: ScanThresholds::default(),
            target_url: DEFAULT_TARGET_URL.to_string(),
            external_daemon: false,
            shutdown_on_teardown: true,
            zap_path: None,
            probe_install_paths: true,
            clear_alerts_on_cleanup: false,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl ScanConfiguration {
    /// Resolve from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let proxy_host = get("ZAP_PROXY_HOST").unwrap_or_else(|| DEFAULT_PROXY_HOST.to_string());
        let proxy_port = parse_or(get("ZAP_PROXY_PORT"), "ZAP_PROXY_PORT", DEFAULT_PROXY_PORT)?;
        let api_url = get("ZAP_API_URL")
            .unwrap_or_else(|| format!("http://{}:{}", proxy_host, proxy_port));

        let thresholds = ScanThresholds {
            max_high: parse_or(get("ZAP_MAX_HIGH"), "ZAP_MAX_HIGH", defaults.thresholds.max_high)?,
            max_medium: parse_or(get("ZAP_MAX_MEDIUM"), "ZAP_MAX_MEDIUM", defaults.thresholds.max_medium)?,
            max_low: parse_or(get("ZAP_MAX_LOW"), "ZAP_MAX_LOW", defaults.thresholds.max_low)?,
        };

        Ok(Self {
            proxy: ProxyEndpoint {
                api_url,
                api_key: get("ZAP_API_KEY").unwrap_or_default(),
                proxy_host,
                proxy_port,
            },
            active_scan: get("ZAP_ACTIVE_SCAN").as_deref() == Some("true"),
            workers: parse_or(get("PW_WORKERS"), "PW_WORKERS", defaults.workers)?,
            thresholds,
            target_url: get("TARGET_URL").unwrap_or(defaults.target_url),
            external_daemon: get("ZAP_EXTERNAL").as_deref() == Some("true"),
            shutdown_on_teardown: get("ZAP_SHUTDOWN").as_deref() != Some("false"),
            zap_path: get("ZAP_PATH").map(PathBuf::from),
            probe_install_paths: get("ZAP_PROBE_INSTALL_PATHS").as_deref() != Some("false"),
            clear_alerts_on_cleanup: get("ZAP_CLEAR_ALERTS").as_deref() == Some("true"),
            report_dir: get("ZAP_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
        })
    }

    /// Scan mode derived from the active-scan flag and worker count
    pub fn scan_mode(&self) -> ScanMode {
        ScanMode {
            scan_type: if self.active_scan {
                ScanType::Active
            } else {
                ScanType::Passive
            },
            workers: self.workers,
        }
    }

    /// Reject active scanning under parallel execution.
    ///
    /// Must run before any daemon or scan action.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "PW_WORKERS must be at least 1".to_string(),
            ));
        }

        if self.active_scan && self.workers > 1 {
            return Err(Error::InvalidConfig(format!(
                "SECURITY VIOLATION: Active scanning requires single worker mode (PW_WORKERS=1), \
                 but {} workers are configured. Active scans modify application state and are \
                 not safe for parallel execution. Either set ZAP_ACTIVE_SCAN=false or PW_WORKERS=1.",
                self.workers
            )));
        }

        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
