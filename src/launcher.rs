//! Dashboard launcher: runs the fetcher and a static file server side by side
//!
//! The fetcher starts first. After a fixed wait the snapshot must exist,
//! otherwise the fetcher is killed and the launch fails. When either child
//! exits the other is killed. On Ctrl-C both get [`SHUTDOWN_GRACE`] to stop
//! on their own first.

use crate::config::LauncherConfig;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};

/// How long a child gets to exit on its own after Ctrl+C before it is killed.
/// Ctrl+C in a terminal reaches the whole process group, so the fetcher is
/// already shutting down its loop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum LaunchError {
    Spawn { program: String, source: std::io::Error },
    SnapshotMissing(PathBuf),
    Io(std::io::Error),
}

impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::Io(err)
    }
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::Spawn { program, source } => {
                write!(f, "Failed to start {}: {}", program, source)
            }
            LaunchError::SnapshotMissing(path) => write!(
                f,
                "Snapshot {} was not written; is the fetcher working?",
                path.display()
            ),
            LaunchError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for LaunchError {}

/// Which side ended the launcher session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    FetcherExited,
    ServerExited,
    Interrupted,
}

fn spawn(program: &str, args: &[String]) -> Result<Child, LaunchError> {
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: program.to_string(),
            source,
        })
}

/// Wait up to `grace` for `child` to exit, then kill it.
/// Returns `true` when the child exited by itself.
async fn stop_child(name: &str, child: &mut Child, grace: Duration) -> bool {
    if !grace.is_zero() {
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            log_exit(name, status);
            return true;
        }
        log::warn!("⚠️  {} still running after {}s, killing", name, grace.as_secs());
    }

    if let Err(e) = child.kill().await {
        log::debug!("{} already stopped: {}", name, e);
    }
    false
}

fn log_exit(name: &str, status: std::io::Result<ExitStatus>) {
    match status {
        Ok(status) if status.success() => log::info!("{} exited", name),
        Ok(status) => log::warn!("⚠️  {} exited with {}", name, status),
        Err(e) => log::error!("❌ Failed waiting for {}: {}", name, e),
    }
}

pub fn snapshot_ready(path: &Path) -> bool {
    path.is_file()
}

/// Run the fetcher and dashboard server until one exits or Ctrl-C arrives
pub async fn launch(config: &LauncherConfig) -> Result<Shutdown, LaunchError> {
    let fetcher_program = config.fetcher_bin.to_string_lossy().into_owned();
    log::info!("🚀 Starting fetcher: {}", fetcher_program);
    let mut fetcher = spawn(&fetcher_program, &[])?;

    tokio::time::sleep(config.startup_wait()).await;

    if !snapshot_ready(&config.snapshot_path) {
        log::error!(
            "❌ No snapshot at {} after {}s",
            config.snapshot_path.display(),
            config.startup_wait_secs
        );
        stop_child("Fetcher", &mut fetcher, Duration::ZERO).await;
        return Err(LaunchError::SnapshotMissing(config.snapshot_path.clone()));
    }

    let (program, args) = match config.server_command.split_first() {
        Some((program, args)) => (program.as_str(), args),
        None => {
            stop_child("Fetcher", &mut fetcher, Duration::ZERO).await;
            return Err(LaunchError::Spawn {
                program: String::new(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "empty server command",
                ),
            });
        }
    };

    log::info!("🌐 Starting dashboard server: {}", config.server_command.join(" "));
    let mut server = match spawn(program, args) {
        Ok(child) => child,
        Err(e) => {
            stop_child("Fetcher", &mut fetcher, Duration::ZERO).await;
            return Err(e);
        }
    };

    log::info!("✅ Dashboard available at {}", config.dashboard_url);
    log::info!("Press Ctrl+C to stop");

    let shutdown = tokio::select! {
        status = fetcher.wait() => {
            log_exit("Fetcher", status);
            Shutdown::FetcherExited
        }
        status = server.wait() => {
            log_exit("Dashboard server", status);
            Shutdown::ServerExited
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            log::info!("🛑 Received Ctrl+C, shutting down");
            Shutdown::Interrupted
        }
    };

    let grace = if shutdown == Shutdown::Interrupted {
        SHUTDOWN_GRACE
    } else {
        Duration::ZERO
    };
    stop_child("Dashboard server", &mut server, grace).await;
    stop_child("Fetcher", &mut fetcher, grace).await;

    log::info!("✅ Launcher stopped");
    Ok(shutdown)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &Path, fetcher: &str, server: &[&str]) -> LauncherConfig {
        LauncherConfig {
            snapshot_path: dir.join("crypto-prices.json"),
            fetcher_bin: PathBuf::from(fetcher),
            server_command: server.iter().map(|s| s.to_string()).collect(),
            startup_wait_secs: 0,
            dashboard_url: "http://localhost:8000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_aborts() {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), "true", &["sleep", "5"]);

        let err = launch(&config).await.unwrap_err();
        assert!(matches!(err, LaunchError::SnapshotMissing(path) if path == config.snapshot_path));
    }

    #[tokio::test]
    async fn test_unknown_fetcher_binary() {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), "/nonexistent/fetcher", &["sleep", "5"]);

        let err = launch(&config).await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_fetcher_exit_stops_server() {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), "true", &["sleep", "30"]);
        std::fs::write(&config.snapshot_path, "{}").unwrap();

        let shutdown = tokio::time::timeout(Duration::from_secs(10), launch(&config))
            .await
            .expect("launcher should return once the fetcher exits")
            .unwrap();
        assert_eq!(shutdown, Shutdown::FetcherExited);
    }

    #[tokio::test]
    async fn test_stop_child_waits_for_clean_exit() {
        let mut child = spawn("sleep", &["0.2".to_string()]).unwrap();

        assert!(stop_child("sleeper", &mut child, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_stop_child_kills_after_grace() {
        let mut child = spawn("sleep", &["30".to_string()]).unwrap();

        let started = std::time::Instant::now();
        assert!(!stop_child("sleeper", &mut child, Duration::from_millis(100)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_server_command() {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), "true", &[]);
        std::fs::write(&config.snapshot_path, "{}").unwrap();

        let err = launch(&config).await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
