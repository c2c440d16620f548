//! Configuration module for birdsync.
//!
//! All settings come from CLI flags and environment variables; the
//! resulting [`Config`] is constructed once at startup, validated, and
//! passed explicitly to every component. There is no ambient global state.

mod paths;

pub use paths::RunContext;

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{BirdsyncError, Result};

/// Application configuration, immutable for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared-secret API key for the management API.
    pub api_key: String,

    /// Base URL of the management API, without trailing slash.
    pub api_url: String,

    /// Path to the BIRD daemon binary.
    pub bird_bin: PathBuf,

    /// Directory holding active configuration files.
    pub etc_dir: PathBuf,

    /// Directory holding daemon control sockets.
    pub run_dir: PathBuf,

    /// Directory for daemon log files.
    pub log_dir: PathBuf,

    /// Directory for per-handle lock markers.
    pub lock_dir: PathBuf,

    /// Optional webhook URL for fatal-error alerts.
    pub alert_url: Option<String>,

    /// Marker string counted by the structural sanity check.
    pub protocol_marker: String,

    /// Timeout in seconds for daemon control commands.
    pub command_timeout_secs: u64,
}

impl Config {
    /// Builds and validates the configuration from parsed CLI input.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Self {
            api_key: cli.api_key.clone(),
            api_url: cli.api_url.trim_end_matches('/').to_string(),
            bird_bin: cli.bird_bin.clone(),
            etc_dir: cli.etc_dir.clone(),
            run_dir: cli.run_dir.clone(),
            log_dir: cli.log_dir.clone(),
            lock_dir: cli.lock_dir.clone(),
            alert_url: cli.alert_url.clone(),
            protocol_marker: cli.protocol_marker.clone(),
            command_timeout_secs: cli.command_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(BirdsyncError::environment("api_key must not be empty"));
        }

        if self.api_url.is_empty() {
            return Err(BirdsyncError::environment("api_url must not be empty"));
        }

        if self.protocol_marker.is_empty() {
            return Err(BirdsyncError::environment(
                "protocol_marker must not be empty",
            ));
        }

        if self.command_timeout_secs == 0 {
            return Err(BirdsyncError::environment("command_timeout must be > 0"));
        }

        Ok(())
    }

    /// Creates the etc/run/log/lock root directories if they do not exist.
    ///
    /// Runs before any remote interaction; a failure here is most likely a
    /// permissions problem and aborts the run.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.etc_dir, &self.run_dir, &self.log_dir, &self.lock_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                BirdsyncError::environment_with_source(
                    format!("could not create directory {}", dir.display()),
                    e,
                )
            })?;
        }

        Ok(())
    }
}
