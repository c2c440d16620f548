//! Command-line interface definition for birdsync.
//!
//! One invocation performs one synchronization run for one router handle,
//! so there are no subcommands. Settings that would normally live in a
//! deployment environment (API key, controller URL, filesystem roots) are
//! exposed as flags with environment-variable fallbacks.

use clap::Parser;
use std::path::PathBuf;

/// birdsync - BIRD configuration synchronization agent
///
/// Fetches a candidate configuration for a router handle from the
/// management API, validates it, and reloads the BIRD daemon if the
/// configuration has changed.
#[derive(Debug, Parser)]
#[command(name = "birdsync")]
#[command(author, version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Router handle to synchronize
    #[arg(short = 'H', long)]
    pub handle: String,

    /// Force a daemon reload even when no change is detected
    #[arg(short, long)]
    pub force: bool,

    /// Enable debug output (equivalent to -v)
    #[arg(short, long)]
    pub debug: bool,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// API key for the management API
    #[arg(long, env = "BIRDSYNC_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the management API (e.g. https://ixp.example.com)
    #[arg(long, env = "BIRDSYNC_API_URL")]
    pub api_url: String,

    /// Path to the BIRD daemon binary
    #[arg(long, env = "BIRDSYNC_BIRD_BIN", default_value = "/usr/sbin/bird")]
    pub bird_bin: PathBuf,

    /// Directory holding the active configuration files
    #[arg(long, env = "BIRDSYNC_ETC_DIR", default_value = "/usr/local/etc/bird")]
    pub etc_dir: PathBuf,

    /// Directory holding the daemon control sockets
    #[arg(long, env = "BIRDSYNC_RUN_DIR", default_value = "/var/run/bird")]
    pub run_dir: PathBuf,

    /// Directory for daemon log files
    #[arg(long, env = "BIRDSYNC_LOG_DIR", default_value = "/var/log/bird")]
    pub log_dir: PathBuf,

    /// Directory for per-handle lock markers
    #[arg(long, env = "BIRDSYNC_LOCK_DIR", default_value = "/tmp/birdsync-locks")]
    pub lock_dir: PathBuf,

    /// Webhook URL for best-effort fatal-error alerts
    #[arg(long, env = "BIRDSYNC_ALERT_URL")]
    pub alert_url: Option<String>,

    /// Marker string counted during the structural sanity check
    #[arg(
        long,
        env = "BIRDSYNC_PROTOCOL_MARKER",
        default_value = "protocol bgp pb_"
    )]
    pub protocol_marker: String,

    /// Timeout in seconds for daemon control commands
    #[arg(long, env = "BIRDSYNC_COMMAND_TIMEOUT", default_value = "60")]
    pub command_timeout: u64,
}

impl Cli {
    /// Returns the effective log level based on debug/verbose/quiet flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        let verbosity = self.verbose.max(u8::from(self.debug));
        match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
