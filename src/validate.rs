//! Validation of the staged configuration before promotion.
//!
//! Three checks, in order: the staged file must exist and be non-empty,
//! it must contain at least [`MIN_PROTOCOL_DEFINITIONS`] occurrences of
//! the protocol marker (a cheap guard against truncated generation
//! output, not a parse), and the daemon itself must accept it in
//! parse-only mode. The earlier checks are cheap and must short-circuit
//! the external syntax check.
//!
//! On failure the staged artifact is left on disk for inspection.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::daemon::control::DaemonControl;
use crate::error::{BirdsyncError, Result};

/// Minimum number of protocol-definition markers a plausible generated
/// configuration contains.
pub const MIN_PROTOCOL_DEFINITIONS: usize = 2;

/// Validates the staged configuration file.
pub async fn validate(
    staged_path: &Path,
    protocol_marker: &str,
    control: &dyn DaemonControl,
) -> Result<()> {
    let size = fs::metadata(staged_path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(BirdsyncError::EmptyConfig {
            path: staged_path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(staged_path)?;
    let found = content.matches(protocol_marker).count();
    if found < MIN_PROTOCOL_DEFINITIONS {
        return Err(BirdsyncError::StructurallyInvalid {
            path: staged_path.to_path_buf(),
            found,
            expected: MIN_PROTOCOL_DEFINITIONS,
        });
    }

    debug!(
        staged = %staged_path.display(),
        protocol_definitions = found,
        "Structural check passed, running daemon syntax check"
    );

    control.check_syntax(staged_path).await?;

    info!(staged = %staged_path.display(), "Staged configuration is valid");
    Ok(())
}
