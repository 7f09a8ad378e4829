//! Daemon launch options

use std::path::PathBuf;
use std::time::Duration;
use zapguard_common::ScanConfiguration;

/// API key used for a locally launched daemon when none is configured
pub const DEFAULT_API_KEY: &str = "security-test-key";

/// Options for launching and reaching a local ZAP daemon
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Explicit executable path, takes precedence over everything else
    pub zap_path: Option<PathBuf>,

    /// Executable path taken from the environment (`ZAP_PATH`)
    pub env_zap_path: Option<PathBuf>,

    /// Probe well-known install locations before falling back to the search path
    pub probe_install_paths: bool,

    /// Host the API is reached at
    pub host: String,

    /// Resolved API base URL (`ZAP_API_URL`), used instead of `host` and `port` when set
    pub api_url: Option<String>,

    /// Port for ZAP to listen on
    pub port: u16,

    /// API key the daemon is started with
    pub api_key: String,

    /// Extra command line options appended to the launch arguments
    pub additional_options: Vec<String>,

    /// How long to wait for the API to come up
    pub startup_timeout: Duration,

    /// Liveness poll interval while starting
    pub startup_poll_interval: Duration,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            zap_path: None,
            env_zap_path: None,
            probe_install_paths: true,
            host: "localhost".to_string(),
            api_url: None,
            port: 8080,
            api_key: DEFAULT_API_KEY.to_string(),
            additional_options: Vec::new(),
            startup_timeout: Duration::from_secs(60),
            startup_poll_interval: Duration::from_secs(1),
        }
    }
}

impl DaemonOptions {
    /// Options for the daemon described by a scan configuration
    pub fn from_config(config: &ScanConfiguration) -> Self {
        let api_key = if config.proxy.api_key.is_empty() {
            DEFAULT_API_KEY.to_string()
        } else {
            config.proxy.api_key.clone()
        };

        Self {
            env_zap_path: config.zap_path.clone(),
            probe_install_paths: config.probe_install_paths,
            host: config.proxy.proxy_host.clone(),
            api_url: Some(config.proxy.api_url.clone()),
            port: config.proxy.proxy_port,
            api_key,
            ..Default::default()
        }
    }

    /// Base URL of the daemon's API
    pub fn api_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_falls_back_to_default_key() {
        let options = DaemonOptions::from_config(&ScanConfiguration::default());
        assert_eq!(options.api_key, DEFAULT_API_KEY);
        assert_eq!(options.api_url(), "http://localhost:8080");
    }

    #[test]
    fn test_from_config_carries_path_and_key() {
        let mut config = ScanConfiguration::default();
        config.proxy.api_key = "k3y".to_string();
        config.proxy.proxy_port = 8095;
        config.zap_path = Some(PathBuf::from("/opt/zap/zap.sh"));
        config.probe_install_paths = false;

        let options = DaemonOptions::from_config(&config);
        assert_eq!(options.api_key, "k3y");
        assert_eq!(options.port, 8095);
        assert_eq!(options.env_zap_path, Some(PathBuf::from("/opt/zap/zap.sh")));
        assert!(options.zap_path.is_none());
        assert!(!options.probe_install_paths);
    }

    #[test]
    fn test_api_url_override_is_honoured() {
        let config = ScanConfiguration::from_lookup(|key| match key {
            "ZAP_API_URL" => Some("http://zap-host:8090".to_string()),
            _ => None,
        })
        .unwrap();

        let options = DaemonOptions::from_config(&config);
        assert_eq!(options.api_url(), "http://zap-host:8090");
        assert_eq!(options.port, 8080);
    }

    #[test]
    fn test_api_url_without_override_uses_host_and_port() {
        let options = DaemonOptions {
            host: "127.0.0.1".to_string(),
            port: 8091,
            ..Default::default()
        };
        assert_eq!(options.api_url(), "http://127.0.0.1:8091");
    }
}
