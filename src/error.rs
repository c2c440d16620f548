//! Error types and error handling for birdsync.
//!
//! Every fatal error maps to a distinct process exit code so that an
//! external supervisor can distinguish failure causes without parsing
//! log output.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes. The numbering follows the long-standing convention
/// of the IXP Manager router update scripts and must be preserved.
pub mod exit_code {
    /// Success.
    pub const SUCCESS: i32 = 0;
    /// Environment/configuration error, lock already held, or any other
    /// fatal condition without a dedicated code.
    pub const GENERAL_ERROR: i32 = 1;
    /// Staged configuration file is missing or empty.
    pub const EMPTY_CONFIG: i32 = 3;
    /// Staged configuration failed the structural sanity check.
    pub const INVALID_CONFIG: i32 = 4;
    /// The daemon could not be started.
    pub const START_FAILED: i32 = 5;
    /// Rollback to the previous configuration failed.
    pub const REVERT_FAILED: i32 = 6;
    /// The daemon rejected the staged configuration in parse-only mode.
    pub const SYNTAX_CHECK_FAILED: i32 = 7;
    /// The controller refused to hand out the remote update lock.
    pub const REMOTE_LOCK_UNAVAILABLE: i32 = 200;
}

/// The main error type for birdsync.
#[derive(Debug, Error)]
pub enum BirdsyncError {
    /// Missing or invalid environment settings, or directory bootstrap failure.
    #[error("Environment error: {message}")]
    Environment {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Another run holds the per-handle lock marker.
    #[error("Another instance is running for {handle} and locked via {}", path.display())]
    LockHeld { handle: String, path: PathBuf },

    /// The controller did not grant the remote update lock.
    #[error("Router {handle} not available for update")]
    RemoteLockUnavailable {
        handle: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fetching or staging the candidate configuration failed.
    #[error("Failed to fetch configuration from {url}")]
    Fetch {
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The staged configuration file is missing or zero-sized.
    #[error("Staged configuration {} does not exist or is zero size", path.display())]
    EmptyConfig { path: PathBuf },

    /// Fewer protocol definitions than expected in the staged file.
    #[error(
        "Fewer than {expected} protocol definitions ({found}) in staged configuration {} - something has gone wrong",
        path.display()
    )]
    StructurallyInvalid {
        path: PathBuf,
        found: usize,
        expected: usize,
    },

    /// The daemon's parse-only check rejected the staged configuration.
    #[error("Syntax check failed for {}: {output}", path.display())]
    SyntaxCheck { path: PathBuf, output: String },

    /// The daemon could not be started at all.
    #[error("Could not start daemon: {message}")]
    DaemonStart { message: String },

    /// Reconfigure failed. Either no rollback was possible, or the previous
    /// configuration was restored but the intended update did not apply.
    #[error("Reconfigure failed: {message}")]
    Reconfigure { message: String },

    /// Reconfigure failed and restoring the previous configuration also
    /// failed. The daemon's configuration is in an unknown state.
    #[error("Revert to previous configuration failed: {message}")]
    RevertFailed { message: String },

    /// The run was cancelled by a signal.
    #[error("Interrupted by signal")]
    Interrupted,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BirdsyncError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BirdsyncError::EmptyConfig { .. } => exit_code::EMPTY_CONFIG,
            BirdsyncError::StructurallyInvalid { .. } => exit_code::INVALID_CONFIG,
            BirdsyncError::DaemonStart { .. } => exit_code::START_FAILED,
            BirdsyncError::RevertFailed { .. } => exit_code::REVERT_FAILED,
            BirdsyncError::SyntaxCheck { .. } => exit_code::SYNTAX_CHECK_FAILED,
            BirdsyncError::RemoteLockUnavailable { .. } => exit_code::REMOTE_LOCK_UNAVAILABLE,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Creates an environment error with a message.
    pub fn environment(message: impl Into<String>) -> Self {
        BirdsyncError::Environment {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an environment error with a message and source.
    pub fn environment_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BirdsyncError::Environment {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a fetch error with a source.
    pub fn fetch_with_source(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BirdsyncError::Fetch {
            url: url.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a remote-lock-unavailable error with a source.
    pub fn remote_lock_unavailable(
        handle: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BirdsyncError::RemoteLockUnavailable {
            handle: handle.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a daemon start error.
    pub fn daemon_start(message: impl Into<String>) -> Self {
        BirdsyncError::DaemonStart {
            message: message.into(),
        }
    }

    /// Creates a reconfigure error.
    pub fn reconfigure(message: impl Into<String>) -> Self {
        BirdsyncError::Reconfigure {
            message: message.into(),
        }
    }

    /// Creates a revert-failed error.
    pub fn revert_failed(message: impl Into<String>) -> Self {
        BirdsyncError::RevertFailed {
            message: message.into(),
        }
    }
}

/// Result type alias for birdsync operations.
pub type Result<T> = std::result::Result<T, BirdsyncError>;
