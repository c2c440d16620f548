//! birdsync - BIRD configuration synchronization agent
//!
//! Entry point. Parses the CLI, builds the immutable run configuration,
//! and drives one synchronization run. SIGINT/SIGTERM cancel the run by
//! dropping the pipeline future, which releases the per-handle lock
//! through its guard.

use birdsync::cli::Cli;
use birdsync::config::{Config, RunContext};
use birdsync::error::BirdsyncError;
use birdsync::{alert, pipeline};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber based on CLI flags.
///
/// `RUST_LOG` takes precedence over the flag-derived level so operators
/// can scope verbosity per module.
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Main application logic.
fn run(cli: &Cli) -> birdsync::Result<()> {
    let config = Config::from_cli(cli)?;
    config.ensure_dirs()?;

    let ctx = RunContext::new(&config, &cli.handle, cli.force);

    tracing::info!(
        handle = %ctx.handle,
        active = %ctx.active_path.display(),
        socket = %ctx.socket_path.display(),
        force_reload = ctx.force_reload,
        "Starting synchronization run"
    );

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        BirdsyncError::environment_with_source("failed to create async runtime", e)
    })?;

    runtime.block_on(async {
        let result = tokio::select! {
            result = pipeline::run(&config, &ctx) => result,
            _ = shutdown_signal() => Err(BirdsyncError::Interrupted),
        };

        if let Err(e) = &result {
            alert::notify_fatal(config.alert_url.as_deref(), &ctx.handle, e).await;
        }

        result
    })
}

/// Completes when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "Could not install SIGTERM handler");
            // Fall back to SIGINT only.
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }

    tracing::warn!("Received shutdown signal, cancelling run");
}
