//! Daemon lifecycle tests against a simulated ZAP API

use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zapguard_common::Error;
use zapguard_daemon::{DaemonOptions, DaemonState, DaemonSupervisor, ZapDaemon};

const API_KEY: &str = "lifecycle-key";

/// Options pointing at `port` with an executable that cannot be launched,
/// so any launch attempt surfaces as an error
fn options_for_port(port: u16) -> DaemonOptions {
    DaemonOptions {
        zap_path: Some(PathBuf::from("/nonexistent/zaproxy/zap.sh")),
        probe_install_paths: false,
        host: "127.0.0.1".to_string(),
        port,
        api_key: API_KEY.to_string(),
        startup_timeout: Duration::from_millis(300),
        startup_poll_interval: Duration::from_millis(20),
        ..Default::default()
    }
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn mount_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/JSON/core/view/version/"))
        .and(query_param("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "2.15.0" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_start_is_idempotent_when_already_running() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let mut daemon = ZapDaemon::new(options_for_port(server.address().port())).unwrap();
    assert_eq!(daemon.state(), DaemonState::NotStarted);

    daemon.start().await.unwrap();
    daemon.start().await.unwrap();

    assert_eq!(daemon.state(), DaemonState::Running);
    assert!(daemon.pid().is_none());
    assert!(daemon.is_running().await);
}

#[tokio::test]
async fn test_start_reports_launch_failure() {
    let mut daemon = ZapDaemon::new(options_for_port(closed_port())).unwrap();

    let err = daemon.start().await.unwrap_err();

    assert!(matches!(err, Error::DaemonLaunch(ref msg) if msg.contains("/nonexistent/zaproxy/zap.sh")));
    assert_eq!(daemon.state(), DaemonState::NotStarted);
}

#[cfg(unix)]
#[tokio::test]
async fn test_start_times_out_when_api_never_answers() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("zap.sh");
    std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut daemon = ZapDaemon::new(DaemonOptions {
        zap_path: Some(script),
        ..options_for_port(closed_port())
    })
    .unwrap();

    let err = daemon.start().await.unwrap_err();

    assert!(matches!(err, Error::DaemonStartup { .. }));
    assert_eq!(daemon.state(), DaemonState::Stopped);
    assert!(daemon.pid().is_none());
}

#[tokio::test]
async fn test_stop_requests_graceful_shutdown() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    Mock::given(method("GET"))
        .and(path("/JSON/core/action/shutdown/"))
        .and(query_param("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Result": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut daemon = ZapDaemon::new(options_for_port(server.address().port())).unwrap();
    daemon.start().await.unwrap();
    daemon.stop().await.unwrap();

    assert_eq!(daemon.state(), DaemonState::Stopped);
}

#[tokio::test]
async fn test_stop_is_idempotent_when_not_running() {
    let mut daemon = ZapDaemon::new(options_for_port(closed_port())).unwrap();

    daemon.stop().await.unwrap();
    daemon.stop().await.unwrap();

    assert_eq!(daemon.state(), DaemonState::Stopped);
}

#[tokio::test]
async fn test_supervisor_returns_same_daemon_until_shutdown() {
    let first_port = closed_port();
    let mut supervisor = DaemonSupervisor::new();
    assert!(supervisor.current().is_none());

    let url = supervisor
        .get_or_create(options_for_port(first_port))
        .unwrap()
        .client()
        .api_url()
        .to_string();
    let again = supervisor
        .get_or_create(options_for_port(first_port + 1))
        .unwrap()
        .client()
        .api_url()
        .to_string();
    assert_eq!(url, again);

    supervisor.shutdown().await.unwrap();
    assert!(supervisor.current().is_none());

    let fresh = supervisor
        .get_or_create(options_for_port(first_port + 1))
        .unwrap();
    assert_eq!(fresh.options().port, first_port + 1);
    assert_eq!(fresh.state(), DaemonState::NotStarted);
}

#[tokio::test]
async fn test_supervisor_shutdown_without_daemon() {
    let mut supervisor = DaemonSupervisor::new();
    supervisor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_configured_api_url_reuses_running_daemon() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let mut config = zapguard_common::ScanConfiguration::default();
    config.proxy.api_url = server.uri();
    config.proxy.api_key = API_KEY.to_string();
    config.proxy.proxy_port = closed_port();
    config.zap_path = Some(PathBuf::from("/nonexistent/zaproxy/zap.sh"));
    config.probe_install_paths = false;

    let mut daemon = ZapDaemon::new(DaemonOptions::from_config(&config)).unwrap();
    assert_eq!(daemon.client().api_url(), server.uri());

    daemon.start().await.unwrap();

    assert_eq!(daemon.state(), DaemonState::Running);
    assert!(daemon.pid().is_none());
}
