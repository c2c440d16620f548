//! The end-to-end synchronization pipeline.
//!
//! Sequencing: local lock, remote lock, fetch, validate, change-detect,
//! promote or discard, reload orchestration, completion report. Any
//! stage failure short-circuits everything after it except release of
//! the local lock, which is guaranteed by the guard's drop.

use tracing::info;

use crate::client::ManagerClient;
use crate::config::{Config, RunContext};
use crate::daemon::{BirdControl, DaemonControl, ReloadOrchestrator, ReloadOutcome};
use crate::detect::{self, ChangeOutcome};
use crate::error::{BirdsyncError, Result};
use crate::lock::LockGuard;
use crate::validate;

/// Whether the running daemon must be told to reconfigure.
pub fn reload_required(outcome: ChangeOutcome, force_reload: bool) -> bool {
    force_reload || outcome == ChangeOutcome::Changed
}

/// Runs one full synchronization for the context's handle.
pub async fn run(config: &Config, ctx: &RunContext) -> Result<()> {
    let control = BirdControl::new(config, ctx);
    run_with_control(config, ctx, &control).await
}

/// Pipeline body, generic over the daemon control seam.
async fn run_with_control(
    config: &Config,
    ctx: &RunContext,
    control: &dyn DaemonControl,
) -> Result<()> {
    let _lock = LockGuard::acquire(&ctx.lock_path, &ctx.handle)?;

    let client = ManagerClient::new(config)?;
    client.acquire_update_lock(&ctx.handle).await?;
    client.fetch_config(&ctx.handle, &ctx.staging_path).await?;

    validate::validate(&ctx.staging_path, &config.protocol_marker, control).await?;

    let change = detect::detect_change(&ctx.active_path, &ctx.staging_path)?;
    match change {
        ChangeOutcome::NoChange => detect::discard(&ctx.staging_path)?,
        ChangeOutcome::Changed => {
            detect::promote(&ctx.active_path, &ctx.staging_path, &ctx.backup_path)?;
        }
    }

    let orchestrator = ReloadOrchestrator::new(control, ctx);
    let outcome = orchestrator
        .run(reload_required(change, ctx.force_reload))
        .await?;

    if outcome == ReloadOutcome::RolledBack {
        // The daemon is operative again on the previous configuration, so
        // the controller's update lock must still be released; the
        // completion report goes out before the failure is surfaced.
        client.report_done(&ctx.handle).await;
        return Err(BirdsyncError::reconfigure(
            "previous configuration restored, intended update not applied",
        ));
    }

    info!(handle = %ctx.handle, outcome = ?outcome, "Synchronization complete");

    client.report_done(&ctx.handle).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_reload_required_truth_table() {
        assert!(!reload_required(ChangeOutcome::NoChange, false));
        assert!(reload_required(ChangeOutcome::NoChange, true));
        assert!(reload_required(ChangeOutcome::Changed, false));
        assert!(reload_required(ChangeOutcome::Changed, true));
    }

    fn test_setup(tmp: &TempDir, api_url: &str) -> (Config, RunContext) {
        let cli = Cli::parse_from([
            "birdsync",
            "--api-key",
            "secret",
            "--api-url",
            api_url,
            "-H",
            "rs1",
            "--etc-dir",
            tmp.path().to_str().unwrap(),
            "--run-dir",
            tmp.path().to_str().unwrap(),
            "--log-dir",
            tmp.path().to_str().unwrap(),
            "--lock-dir",
            tmp.path().to_str().unwrap(),
        ]);
        let config = Config::from_cli(&cli).unwrap();
        let ctx = RunContext::new(&config, "rs1", false);
        (config, ctx)
    }

    #[tokio::test]
    async fn test_lock_held_short_circuits_before_network() {
        let tmp = TempDir::new().unwrap();
        let (config, ctx) = test_setup(&tmp, "http://127.0.0.1:1");

        std::fs::write(&ctx.lock_path, "12345").unwrap();

        let result = run(&config, &ctx).await;
        assert!(matches!(result, Err(BirdsyncError::LockHeld { .. })));

        // The foreign marker must survive the failed attempt untouched.
        assert_eq!(std::fs::read_to_string(&ctx.lock_path).unwrap(), "12345");
        assert!(!ctx.staging_path.exists());
    }

    use crate::daemon::DaemonState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct ScriptedControl {
        state: DaemonState,
        configure_results: Mutex<VecDeque<bool>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedControl {
        fn new(state: DaemonState, configure_results: &[bool]) -> Self {
            Self {
                state,
                configure_results: Mutex::new(configure_results.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DaemonControl for ScriptedControl {
        async fn probe(&self) -> DaemonState {
            self.calls.lock().unwrap().push("probe");
            self.state
        }

        async fn start(&self) -> crate::error::Result<()> {
            self.calls.lock().unwrap().push("start");
            Ok(())
        }

        async fn configure(&self) -> crate::error::Result<()> {
            self.calls.lock().unwrap().push("configure");
            let ok = self
                .configure_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(true);
            if ok {
                Ok(())
            } else {
                Err(BirdsyncError::reconfigure("scripted configure failure"))
            }
        }

        async fn check_syntax(&self, _path: &Path) -> crate::error::Result<()> {
            self.calls.lock().unwrap().push("check_syntax");
            Ok(())
        }
    }

    const FETCHED_CONFIG: &str =
        "router id 192.0.2.1;\nprotocol bgp pb_a {}\nprotocol bgp pb_b {}\n";

    /// Minimal controller stub: answers every request with 200, serves the
    /// canned configuration on the gen-config endpoint, and records the
    /// request paths in arrival order.
    async fn spawn_stub_controller() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let recorded = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };

                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();

                let body = if path.starts_with("/api/v4/router/gen-config/") {
                    FETCHED_CONFIG
                } else {
                    ""
                };
                // Record before responding so the caller observes the hit
                // as soon as its request completes.
                recorded.lock().unwrap().push(path);

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_rolled_back_run_still_reports_done() {
        let tmp = TempDir::new().unwrap();
        let (base_url, hits) = spawn_stub_controller().await;
        let (config, ctx) = test_setup(&tmp, &base_url);

        std::fs::write(&ctx.active_path, "router id 192.0.2.9;\nprotocol bgp pb_z {}\n")
            .unwrap();

        // First configure rejects the promoted configuration, the retry
        // against the restored backup succeeds.
        let control = ScriptedControl::new(DaemonState::Running, &[false, true]);

        let result = run_with_control(&config, &ctx, &control).await;

        assert!(matches!(result, Err(BirdsyncError::Reconfigure { .. })));
        assert_eq!(
            control.calls(),
            vec!["check_syntax", "probe", "configure", "configure"]
        );

        // The controller's update lock was released despite the failure.
        let paths = hits.lock().unwrap().clone();
        assert_eq!(
            paths,
            vec![
                "/api/v4/router/get-update-lock/rs1".to_string(),
                "/api/v4/router/gen-config/rs1".to_string(),
                "/api/v4/router/updated/rs1".to_string(),
            ]
        );

        // Rollback left the previous configuration active and parked the
        // rejected one for postmortem.
        assert_eq!(
            std::fs::read_to_string(&ctx.active_path).unwrap(),
            "router id 192.0.2.9;\nprotocol bgp pb_z {}\n"
        );
        assert_eq!(
            std::fs::read_to_string(&ctx.failed_path).unwrap(),
            FETCHED_CONFIG
        );
        assert!(!ctx.lock_path.exists());
    }

    #[tokio::test]
    async fn test_unchanged_config_skips_daemon_and_reports_done() {
        let tmp = TempDir::new().unwrap();
        let (base_url, hits) = spawn_stub_controller().await;
        let (config, ctx) = test_setup(&tmp, &base_url);

        // Identical to the fetched configuration modulo a comment line.
        let active = format!("# generated earlier\n{}", FETCHED_CONFIG);
        std::fs::write(&ctx.active_path, &active).unwrap();

        let control = ScriptedControl::new(DaemonState::Running, &[]);

        run_with_control(&config, &ctx, &control).await.unwrap();

        // No daemon command beyond the probe, staged file discarded,
        // active file and (absent) backup untouched.
        assert_eq!(control.calls(), vec!["check_syntax", "probe"]);
        assert!(!ctx.staging_path.exists());
        assert!(!ctx.backup_path.exists());
        assert_eq!(std::fs::read_to_string(&ctx.active_path).unwrap(), active);

        let paths = hits.lock().unwrap().clone();
        assert_eq!(paths.last().unwrap(), "/api/v4/router/updated/rs1");
    }

    #[tokio::test]
    async fn test_lock_released_after_remote_failure() {
        let tmp = TempDir::new().unwrap();
        // Nothing listens here, so the remote-lock stage fails.
        let (config, ctx) = test_setup(&tmp, "http://127.0.0.1:1");

        let result = run(&config, &ctx).await;
        assert!(matches!(
            result,
            Err(BirdsyncError::RemoteLockUnavailable { .. })
        ));

        // Guaranteed release: the marker is gone despite the failure.
        assert!(!ctx.lock_path.exists());
        assert!(!ctx.staging_path.exists());
    }
}
