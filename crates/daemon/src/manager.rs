//! ZAP daemon lifecycle
//!
//! Starts a local ZAP in daemon mode, waits for its API, and shuts it down
//! again. The orchestrator never starts or stops ZAP itself; it only talks to
//! the API through [`ZapDaemon::client`].

use std::process::Child;
use tracing::{debug, info, warn};
use zapguard_common::{poll_until, Error, PollSpec, ProxyEndpoint, Result, ZapClient};

use crate::config::DaemonOptions;
use crate::launcher::{build_args, display_args, resolve_for, spawn_detached};

/// Daemon lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    NotStarted,
    Starting,
    Running,
    Stopped,
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonState::NotStarted => write!(f, "not started"),
            DaemonState::Starting => write!(f, "starting"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Handle to a local ZAP daemon
pub struct ZapDaemon {
    options: DaemonOptions,
    client: ZapClient,
    child: Option<Child>,
    state: DaemonState,
}

impl ZapDaemon {
    /// Create a manager for the daemon described by `options`. Nothing is launched yet.
    pub fn new(options: DaemonOptions) -> Result<Self> {
        let endpoint = ProxyEndpoint {
            api_url: options.api_url(),
            api_key: options.api_key.clone(),
            proxy_host: options.host.clone(),
            proxy_port: options.port,
        };
        let client = ZapClient::new(endpoint)?;

        Ok(Self {
            options,
            client,
            child: None,
            state: DaemonState::NotStarted,
        })
    }

    /// API client bound to this daemon
    pub fn client(&self) -> &ZapClient {
        &self.client
    }

    /// Endpoint the daemon is reached at
    pub fn endpoint(&self) -> &ProxyEndpoint {
        self.client.endpoint()
    }

    pub fn options(&self) -> &DaemonOptions {
        &self.options
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// PID of the process this manager launched, if any
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub async fn is_running(&self) -> bool {
        self.client.is_running().await
    }

    /// Start ZAP in daemon mode. No-op if the API already answers.
    pub async fn start(&mut self) -> Result<()> {
        if self.client.is_running().await {
            info!("ZAP daemon already running at {}", self.client.api_url());
            self.state = DaemonState::Running;
            return Ok(());
        }

        let executable = resolve_for(&self.options);
        let args = build_args(&self.options);

        info!(
            "Starting ZAP daemon ({}): {} {}",
            executable.source,
            executable.path.display(),
            display_args(&args)
        );

        self.state = DaemonState::Starting;
        let child = match spawn_detached(&executable.path, &args) {
            Ok(child) => child,
            Err(e) => {
                self.state = DaemonState::NotStarted;
                return Err(e);
            }
        };
        debug!("ZAP daemon spawned with pid {}", child.id());
        self.child = Some(child);

        if let Err(e) = self.wait_for_startup().await {
            warn!("ZAP daemon did not come up, terminating it");
            self.terminate_child();
            self.state = DaemonState::Stopped;
            return Err(e);
        }

        self.state = DaemonState::Running;
        info!("ZAP daemon started successfully at {}", self.client.api_url());
        Ok(())
    }

    async fn wait_for_startup(&self) -> Result<()> {
        let client = &self.client;
        let spec = PollSpec::new(
            self.options.startup_poll_interval,
            self.options.startup_timeout,
        );

        poll_until(
            "ZAP daemon startup",
            spec,
            move || async move { Ok::<_, Error>(client.is_running().await) },
            |up| *up,
            None,
        )
        .await
        .map(|_| ())
        .map_err(|e| match e {
            Error::Timeout { timeout, .. } => Error::DaemonStartup { timeout },
            other => other,
        })
    }

    /// Stop the daemon: graceful API shutdown first, then SIGTERM to the
    /// process we launched. Stopping a daemon that is not running is not an error.
    pub async fn stop(&mut self) -> Result<()> {
        match self.client.shutdown().await {
            Ok(()) => info!("ZAP daemon shutdown requested via API"),
            Err(e) => {
                debug!("Graceful shutdown unavailable: {}", e);
                self.terminate_child();
            }
        }

        if let Some(mut child) = self.child.take() {
            // Reap if it already exited; otherwise leave it to finish on its own
            let _ = child.try_wait();
        }

        self.state = DaemonState::Stopped;
        info!("ZAP daemon stopped");
        Ok(())
    }

    fn terminate_child(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            match kill(pid, Signal::SIGTERM) {
                Ok(()) => info!("Sent SIGTERM to ZAP daemon (pid: {})", child.id()),
                Err(e) => warn!("Failed to signal ZAP daemon (pid: {}): {}", child.id(), e),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = child.kill() {
                warn!("Failed to kill ZAP daemon (pid: {}): {}", child.id(), e);
            }
        }

        let _ = child.try_wait();
    }
}
