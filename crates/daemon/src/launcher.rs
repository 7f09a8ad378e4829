//! ZAP process launching
//!
//! Resolves the daemon executable and spawns it detached so it can outlive
//! the process that started it.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::debug;
use zapguard_common::{Error, Result};

use crate::config::DaemonOptions;

/// Install locations probed when no path is configured
pub const WELL_KNOWN_INSTALL_PATHS: &[&str] = &[
    // macOS
    "/Applications/ZAP.app/Contents/Java/zap.sh",
    "/Applications/OWASP ZAP.app/Contents/Java/zap.sh",
    // Linux
    "/usr/share/zaproxy/zap.sh",
    "/opt/zaproxy/zap.sh",
];

/// Executable name expected on the search path as a last resort
pub const SEARCH_PATH_EXECUTABLE: &str = "zap.sh";

/// Where a resolved executable path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableSource {
    Explicit,
    Environment,
    WellKnown,
    SearchPath,
}

impl std::fmt::Display for ExecutableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutableSource::Explicit => write!(f, "explicit path"),
            ExecutableSource::Environment => write!(f, "ZAP_PATH"),
            ExecutableSource::WellKnown => write!(f, "well-known install location"),
            ExecutableSource::SearchPath => write!(f, "search path"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    pub path: PathBuf,
    pub source: ExecutableSource,
}

/// Resolve the executable: explicit override, then environment, then the
/// first existing candidate, then the bare name on the search path.
pub fn resolve_executable<P: AsRef<Path>>(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    candidates: &[P],
) -> ResolvedExecutable {
    if let Some(path) = explicit {
        return ResolvedExecutable {
            path: path.to_path_buf(),
            source: ExecutableSource::Explicit,
        };
    }

    if let Some(path) = env_path {
        return ResolvedExecutable {
            path: path.to_path_buf(),
            source: ExecutableSource::Environment,
        };
    }

    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate.is_file() {
            return ResolvedExecutable {
                path: candidate.to_path_buf(),
                source: ExecutableSource::WellKnown,
            };
        }
        debug!("No ZAP installation at {}", candidate.display());
    }

    ResolvedExecutable {
        path: PathBuf::from(SEARCH_PATH_EXECUTABLE),
        source: ExecutableSource::SearchPath,
    }
}

/// Resolve the executable for the given options
pub fn resolve_for(options: &DaemonOptions) -> ResolvedExecutable {
    let candidates: &[&str] = if options.probe_install_paths {
        WELL_KNOWN_INSTALL_PATHS
    } else {
        &[]
    };
    resolve_executable(
        options.zap_path.as_deref(),
        options.env_zap_path.as_deref(),
        candidates,
    )
}

/// Build daemon-mode command line arguments
pub fn build_args(options: &DaemonOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-daemon".to_string(),
        "-host".to_string(),
        "0.0.0.0".to_string(),
        "-port".to_string(),
        options.port.to_string(),
    ];

    let config = [
        "api.disablekey=false".to_string(),
        format!("api.key={}", options.api_key),
        "api.addrs.addr.name=.*".to_string(),
        "api.addrs.addr.regex=true".to_string(),
        "connection.timeoutInSecs=120".to_string(),
    ];
    for entry in config {
        args.push("-config".to_string());
        args.push(entry);
    }

    args.extend(options.additional_options.iter().cloned());
    args
}

/// Render arguments for logging with the API key masked
pub fn display_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.starts_with("api.key=") {
                "api.key=***".to_string()
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawn the daemon detached from this process's terminal and process group
pub fn spawn_detached(executable: &Path, args: &[String]) -> Result<Child> {
    let mut cmd = Command::new(executable);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
        .map_err(|e| Error::DaemonLaunch(format!("{}: {}", executable.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let resolved = resolve_executable(
            Some(Path::new("/custom/zap.sh")),
            Some(Path::new("/env/zap.sh")),
            WELL_KNOWN_INSTALL_PATHS,
        );
        assert_eq!(resolved.path, PathBuf::from("/custom/zap.sh"));
        assert_eq!(resolved.source, ExecutableSource::Explicit);
    }

    #[test]
    fn test_environment_path_before_probing() {
        let resolved = resolve_executable(None, Some(Path::new("/env/zap.sh")), WELL_KNOWN_INSTALL_PATHS);
        assert_eq!(resolved.source, ExecutableSource::Environment);
    }

    #[test]
    fn test_first_existing_candidate_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing/zap.sh");
        let present = dir.path().join("zap.sh");
        std::fs::write(&present, "#!/bin/sh\n").unwrap();

        let resolved = resolve_executable(None, None, &[missing, present.clone()]);
        assert_eq!(resolved.path, present);
        assert_eq!(resolved.source, ExecutableSource::WellKnown);
    }

    #[test]
    fn test_falls_back_to_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_executable(None, None, &[dir.path().join("nope.sh")]);
        assert_eq!(resolved.path, PathBuf::from(SEARCH_PATH_EXECUTABLE));
        assert_eq!(resolved.source, ExecutableSource::SearchPath);
    }

    #[test]
    fn test_probing_can_be_disabled() {
        let options = DaemonOptions {
            probe_install_paths: false,
            ..Default::default()
        };
        assert_eq!(resolve_for(&options).source, ExecutableSource::SearchPath);
    }

    #[test]
    fn test_build_args() {
        let options = DaemonOptions {
            port: 8090,
            api_key: "abc".to_string(),
            additional_options: vec!["-silent".to_string()],
            ..Default::default()
        };
        let args = build_args(&options);

        assert_eq!(&args[..5], &["-daemon", "-host", "0.0.0.0", "-port", "8090"]);
        assert!(args.windows(2).any(|w| w[0] == "-config" && w[1] == "api.key=abc"));
        assert!(args.windows(2).any(|w| w[0] == "-config" && w[1] == "api.addrs.addr.name=.*"));
        assert!(args.contains(&"connection.timeoutInSecs=120".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-silent"));
    }

    #[test]
    fn test_display_args_masks_key() {
        let args = build_args(&DaemonOptions {
            api_key: "hunter2".to_string(),
            ..Default::default()
        });
        let shown = display_args(&args);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("api.key=***"));
    }
}
