//! The daemon control seam.
//!
//! [`DaemonControl`] abstracts the four operations birdsync needs from
//! the routing daemon so the reload orchestrator and the validator can
//! be exercised against a mock in tests. [`BirdControl`] is the
//! production implementation shelling out to `bird`/`birdc`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, RunContext};
use crate::daemon::invoke::invoke;
use crate::error::{BirdsyncError, Result};

/// Observable daemon status derived from the control-socket probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// The daemon answered on its control socket.
    Running,
    /// The control socket is unreachable or the probe exited non-zero.
    NotRunning,
}

/// Control operations against the routing daemon.
#[async_trait]
pub trait DaemonControl: Send + Sync {
    /// Probes the daemon's control socket for liveness.
    async fn probe(&self) -> DaemonState;

    /// Starts the daemon against the active configuration and socket.
    async fn start(&self) -> Result<()>;

    /// Tells the running daemon to adopt the active configuration.
    async fn configure(&self) -> Result<()>;

    /// Runs the daemon in parse-only mode against the given file.
    async fn check_syntax(&self, path: &Path) -> Result<()>;
}

/// Production [`DaemonControl`] implementation for BIRD.
///
/// The client binary is derived from the daemon binary by appending `c`
/// (`/usr/sbin/bird` controls via `/usr/sbin/birdc`), matching the BIRD
/// installation layout.
pub struct BirdControl {
    bird_bin: PathBuf,
    birdc_bin: PathBuf,
    active_path: PathBuf,
    socket_path: PathBuf,
    timeout: Duration,
}

impl BirdControl {
    /// Creates the control handle for one run.
    pub fn new(config: &Config, ctx: &RunContext) -> Self {
        let birdc_bin = PathBuf::from(format!("{}c", config.bird_bin.display()));

        Self {
            bird_bin: config.bird_bin.clone(),
            birdc_bin,
            active_path: ctx.active_path.clone(),
            socket_path: ctx.socket_path.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }
}

#[async_trait]
impl DaemonControl for BirdControl {
    async fn probe(&self) -> DaemonState {
        let command = format!(
            "{} -s {} show status",
            self.birdc_bin.display(),
            self.socket_path.display()
        );

        match invoke(&command, self.timeout).await {
            Ok(inv) if inv.success => DaemonState::Running,
            Ok(inv) => {
                debug!(output = %inv.output, "Daemon status probe failed");
                DaemonState::NotRunning
            }
            Err(e) => {
                debug!(error = %e, "Daemon status probe could not run");
                DaemonState::NotRunning
            }
        }
    }

    async fn start(&self) -> Result<()> {
        let command = format!(
            "{} -c {} -s {}",
            self.bird_bin.display(),
            self.active_path.display(),
            self.socket_path.display()
        );

        let inv = invoke(&command, self.timeout)
            .await
            .map_err(|e| BirdsyncError::daemon_start(e.to_string()))?;

        if inv.success {
            Ok(())
        } else {
            Err(BirdsyncError::daemon_start(format!(
                "command '{}' failed: {}",
                command, inv.output
            )))
        }
    }

    async fn configure(&self) -> Result<()> {
        let command = format!(
            "{} -s {} configure",
            self.birdc_bin.display(),
            self.socket_path.display()
        );

        let inv = invoke(&command, self.timeout)
            .await
            .map_err(|e| BirdsyncError::reconfigure(e.to_string()))?;

        if inv.success {
            Ok(())
        } else {
            Err(BirdsyncError::reconfigure(inv.output))
        }
    }

    async fn check_syntax(&self, path: &Path) -> Result<()> {
        let command = format!("{} -p -c {}", self.bird_bin.display(), path.display());

        let inv = invoke(&command, self.timeout)
            .await
            .map_err(|e| BirdsyncError::SyntaxCheck {
                path: path.to_path_buf(),
                output: e.to_string(),
            })?;

        if inv.success {
            Ok(())
        } else {
            Err(BirdsyncError::SyntaxCheck {
                path: path.to_path_buf(),
                output: inv.output,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn test_setup() -> (Config, RunContext) {
        let cli = Cli::parse_from([
            "birdsync",
            "--api-key",
            "secret",
            "--api-url",
            "https://ixp.example.com",
            "-H",
            "rs1",
            "--bird-bin",
            "/usr/sbin/bird",
            "--etc-dir",
            "/etc/bird",
            "--run-dir",
            "/run/bird",
        ]);
        let config = Config::from_cli(&cli).unwrap();
        let ctx = RunContext::with_pid(&config, "rs1", false, 7);
        (config, ctx)
    }

    #[test]
    fn test_birdc_binary_derived_from_bird() {
        let (config, ctx) = test_setup();
        let control = BirdControl::new(&config, &ctx);

        assert_eq!(control.bird_bin, PathBuf::from("/usr/sbin/bird"));
        assert_eq!(control.birdc_bin, PathBuf::from("/usr/sbin/birdc"));
        assert_eq!(control.active_path, PathBuf::from("/etc/bird/bird-rs1.conf"));
        assert_eq!(control.socket_path, PathBuf::from("/run/bird/bird-rs1.ctl"));
        assert_eq!(control.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_probe_not_running_when_binary_missing() {
        let cli = Cli::parse_from([
            "birdsync",
            "--api-key",
            "secret",
            "--api-url",
            "https://ixp.example.com",
            "-H",
            "rs1",
            "--bird-bin",
            "/nonexistent/bird",
        ]);
        let config = Config::from_cli(&cli).unwrap();
        let ctx = RunContext::with_pid(&config, "rs1", false, 7);
        let control = BirdControl::new(&config, &ctx);

        assert_eq!(control.probe().await, DaemonState::NotRunning);
    }
}
