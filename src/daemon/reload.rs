//! Reload orchestration with automatic rollback.
//!
//! State machine over the daemon's observable status. The ordering
//! invariant is that the staged configuration has already been validated
//! and promoted to the active path before the orchestrator runs; rollback
//! therefore moves the active file (which holds the failed content) aside
//! and restores the backup over it.

use std::fs;

use tracing::{error, info, warn};

use crate::config::RunContext;
use crate::daemon::control::{DaemonControl, DaemonState};
use crate::error::{BirdsyncError, Result};

/// Terminal state of a reload orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The daemon was not running and has been started.
    Started,
    /// The running daemon adopted the new configuration.
    Reloaded,
    /// The daemon was running and no reload was required.
    Skipped,
    /// Reconfigure failed; the previous configuration was restored and
    /// the daemon remains operative. The run still counts as a failure
    /// upstream because the intended update did not take effect.
    RolledBack,
}

/// Drives the daemon from its current state to a terminal outcome.
pub struct ReloadOrchestrator<'a> {
    control: &'a dyn DaemonControl,
    ctx: &'a RunContext,
}

impl<'a> ReloadOrchestrator<'a> {
    pub fn new(control: &'a dyn DaemonControl, ctx: &'a RunContext) -> Self {
        Self { control, ctx }
    }

    /// Runs the state machine.
    ///
    /// `reload_required` reflects the change-detection result combined
    /// with the force-reload override; it is irrelevant when the daemon
    /// is not running at all.
    pub async fn run(&self, reload_required: bool) -> Result<ReloadOutcome> {
        match self.control.probe().await {
            DaemonState::NotRunning => {
                info!(handle = %self.ctx.handle, "Daemon not running, starting it");
                self.control.start().await?;
                info!(handle = %self.ctx.handle, "Daemon started");
                Ok(ReloadOutcome::Started)
            }
            DaemonState::Running if !reload_required => {
                info!(
                    handle = %self.ctx.handle,
                    "Daemon running and no reload required, skipping configure"
                );
                Ok(ReloadOutcome::Skipped)
            }
            DaemonState::Running => match self.control.configure().await {
                Ok(()) => {
                    info!(handle = %self.ctx.handle, "Daemon reconfigured");
                    Ok(ReloadOutcome::Reloaded)
                }
                Err(cause) => self.rollback(cause).await,
            },
        }
    }

    /// Restores the backup configuration and reconfigures against it.
    ///
    /// Without a backup, rollback is impossible by definition and the
    /// reconfigure failure is surfaced as fatal.
    async fn rollback(&self, cause: BirdsyncError) -> Result<ReloadOutcome> {
        error!(
            handle = %self.ctx.handle,
            error = %cause,
            "Reconfigure failed"
        );

        if !self.ctx.backup_path.exists() {
            return Err(BirdsyncError::reconfigure(format!(
                "{}; no backup configuration available to revert to",
                cause
            )));
        }

        warn!(handle = %self.ctx.handle, "Trying to revert to previous configuration");

        // The active path holds the configuration that just failed; keep
        // it for postmortem before restoring the backup over it. Once the
        // revert is underway, any failure leaves the daemon's configuration
        // in an unknown condition and must carry the revert-failure code.
        fs::rename(&self.ctx.active_path, &self.ctx.failed_path).map_err(|e| {
            BirdsyncError::revert_failed(format!(
                "could not move failed configuration to {}: {}",
                self.ctx.failed_path.display(),
                e
            ))
        })?;
        fs::rename(&self.ctx.backup_path, &self.ctx.active_path).map_err(|e| {
            BirdsyncError::revert_failed(format!(
                "could not restore backup {} over {}: {}",
                self.ctx.backup_path.display(),
                self.ctx.active_path.display(),
                e
            ))
        })?;

        match self.control.configure().await {
            Ok(()) => {
                warn!(
                    handle = %self.ctx.handle,
                    failed = %self.ctx.failed_path.display(),
                    "Successfully reverted to previous configuration"
                );
                Ok(ReloadOutcome::RolledBack)
            }
            Err(revert_cause) => Err(BirdsyncError::revert_failed(format!(
                "reconfigure failed ({}) and revert also failed ({})",
                cause, revert_cause
            ))),
        }
    }
}
