//! Change detection between the active and staged configurations.
//!
//! Two configurations are considered equivalent when they match after
//! dropping whole-line comments. Only lines whose first non-whitespace
//! character is `#` are filtered; trailing comments on a directive line
//! are significant and kept. The filtered contents are compared via
//! SHA-256 digests, which keeps the comparison constant-size and lines
//! the detector up with future comparison against stored snapshots.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Result;

/// Comment marker for BIRD configuration files.
const COMMENT_MARKER: char = '#';

/// Outcome of comparing the staged configuration against the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The configurations are equivalent modulo whole-line comments.
    NoChange,
    /// The staged configuration differs, or no active configuration exists.
    Changed,
}

/// Compares the staged configuration against the active one.
///
/// A missing active configuration is unconditionally [`ChangeOutcome::Changed`]
/// (first-run bootstrap); no digest is computed in that case.
pub fn detect_change(active_path: &Path, staged_path: &Path) -> Result<ChangeOutcome> {
    if !active_path.exists() {
        info!(
            active = %active_path.display(),
            "No active configuration, treating as changed"
        );
        return Ok(ChangeOutcome::Changed);
    }

    let active_digest = filtered_digest(active_path)?;
    let staged_digest = filtered_digest(staged_path)?;

    if active_digest == staged_digest {
        debug!("No changes detected");
        Ok(ChangeOutcome::NoChange)
    } else {
        debug!("Configuration content changed");
        Ok(ChangeOutcome::Changed)
    }
}

/// SHA-256 digest of a file's content with whole-line comments removed.
fn filtered_digest(path: &Path) -> Result<[u8; 32]> {
    let content = fs::read_to_string(path)?;

    let mut hasher = Sha256::new();
    for line in content.lines().filter(|line| !is_comment_line(line)) {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }

    Ok(hasher.finalize().into())
}

/// True when the line's first non-whitespace character is the comment marker.
fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT_MARKER)
}

/// Discards the staged configuration after a no-change detection.
pub fn discard(staged_path: &Path) -> Result<()> {
    fs::remove_file(staged_path)?;
    info!(staged = %staged_path.display(), "Discarded unchanged staged configuration");
    Ok(())
}

/// Promotes the staged configuration to the active path.
///
/// If an active configuration exists it is first copied to the backup
/// path, overwriting any previous backup. The rename of staged over
/// active is atomic; both files live in the same directory.
pub fn promote(active_path: &Path, staged_path: &Path, backup_path: &Path) -> Result<()> {
    if active_path.exists() {
        fs::copy(active_path, backup_path)?;
        debug!(backup = %backup_path.display(), "Backed up active configuration");
    }

    fs::rename(staged_path, active_path)?;
    info!(active = %active_path.display(), "Promoted staged configuration");
    Ok(())
}
