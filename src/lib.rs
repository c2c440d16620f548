//! birdsync - BIRD configuration synchronization agent
//!
//! This crate keeps a BIRD routing daemon's configuration in sync with a
//! central management API: it fetches the generated configuration for a
//! router handle, validates it, promotes it if it differs semantically
//! from the active one, and reloads the daemon with automatic rollback
//! on failure.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration and per-run path resolution
//! - [`error`] - Error types and exit-code mapping
//! - [`lock`] - Per-handle process exclusivity
//! - [`client`] - Management API client
//! - [`validate`] - Staged-configuration validation
//! - [`detect`] - Change detection and promotion
//! - [`daemon`] - Daemon control and reload orchestration
//! - [`pipeline`] - End-to-end run sequencing
//! - [`alert`] - Best-effort fatal-error alerting

pub mod alert;
pub mod cli;
pub mod client;
pub mod config;
pub mod daemon;
pub mod detect;
pub mod error;
pub mod lock;
pub mod pipeline;
pub mod validate;

// Re-exports for convenience
pub use cli::Cli;
pub use config::{Config, RunContext};
pub use error::{BirdsyncError, Result};
