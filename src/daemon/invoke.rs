//! Process invocation with timeout and captured output.
//!
//! Thin wrapper around `tokio::process` used for every external command
//! birdsync issues (syntax check, status probe, start, reconfigure).

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{BirdsyncError, Result};

/// Result of one external command invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Combined stdout/stderr of the command.
    pub output: String,
}

/// Runs a command line to completion, capturing output.
///
/// The command string is split shell-style. A command that exceeds the
/// timeout counts as a failed invocation rather than an error, since
/// every caller treats "did not complete cleanly" the same way.
pub async fn invoke(command: &str, limit: Duration) -> Result<Invocation> {
    debug!(command = command, "Executing command");

    let parts = shell_words::split(command).map_err(|e| {
        BirdsyncError::environment_with_source(
            format!("failed to parse command '{}'", command),
            e,
        )
    })?;
    if parts.is_empty() {
        return Err(BirdsyncError::environment("empty command"));
    }

    let program = &parts[0];
    let args = &parts[1..];

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = match timeout(limit, cmd.output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Ok(Invocation {
                success: false,
                output: format!("command timed out after {}s", limit.as_secs()),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = if stderr.is_empty() {
        stdout.trim_end().to_string()
    } else {
        format!("{}\n{}", stdout.trim_end(), stderr.trim_end())
    };

    debug!(
        command = command,
        exit_code = output.status.code(),
        output = %combined,
        "Command completed"
    );

    Ok(Invocation {
        success: output.status.success(),
        output: combined,
    })
}
