//! Per-handle run context and filesystem path resolution.

use std::path::PathBuf;

use super::Config;

/// Resolved per-run state: the router handle plus every filesystem path
/// derived from it. Created once at startup and read-only thereafter.
///
/// The staging path embeds the process id so that concurrent runs for
/// different handles never collide on temporary files, and so that a
/// leftover staging file identifies the run that produced it.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Router handle this run operates on.
    pub handle: String,

    /// Active configuration file used by the daemon.
    pub active_path: PathBuf,

    /// Staging file for the freshly fetched configuration.
    pub staging_path: PathBuf,

    /// Backup of the previous active configuration (`<active>.old`).
    pub backup_path: PathBuf,

    /// Postmortem artifact for a configuration that failed to apply
    /// (`<staging>.failed`).
    pub failed_path: PathBuf,

    /// Daemon control socket.
    pub socket_path: PathBuf,

    /// Per-handle lock marker.
    pub lock_path: PathBuf,

    /// Reload even when no change is detected.
    pub force_reload: bool,
}

impl RunContext {
    /// Resolves all per-handle paths from the configuration.
    pub fn new(config: &Config, handle: &str, force_reload: bool) -> Self {
        Self::with_pid(config, handle, force_reload, std::process::id())
    }

    /// Like [`RunContext::new`] but with an explicit pid, for tests.
    pub fn with_pid(config: &Config, handle: &str, force_reload: bool, pid: u32) -> Self {
        let active_path = config.etc_dir.join(format!("bird-{}.conf", handle));
        let staging_path = PathBuf::from(format!("{}.{}", active_path.display(), pid));
        let backup_path = PathBuf::from(format!("{}.old", active_path.display()));
        let failed_path = PathBuf::from(format!("{}.failed", staging_path.display()));
        let socket_path = config.run_dir.join(format!("bird-{}.ctl", handle));
        let lock_path = config.lock_dir.join(format!("{}.lock", handle));

        Self {
            handle: handle.to_string(),
            active_path,
            staging_path,
            backup_path,
            failed_path,
            socket_path,
            lock_path,
            force_reload,
        }
    }
}
