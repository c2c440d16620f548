//! Per-handle process exclusivity via a filesystem lock marker.
//!
//! The marker is advisory: it keeps cooperating birdsync runs from
//! updating the same router concurrently, nothing more. The marker
//! content is the owning process id. There is deliberately no staleness
//! detection - a run killed with SIGKILL leaves its marker behind until
//! an operator clears it, and changing that would alter operational
//! semantics.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{BirdsyncError, Result};

/// Scoped lock over a per-handle marker file.
///
/// Dropping the guard removes the marker, so release happens on every
/// exit path of the run, including error returns and cancellation.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    handle: String,
}

impl LockGuard {
    /// Acquires the lock by creating the marker file atomically.
    ///
    /// Fails with [`BirdsyncError::LockHeld`] if the marker already
    /// exists, without inspecting whether the owning process is alive.
    pub fn acquire(path: &Path, handle: &str) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    BirdsyncError::LockHeld {
                        handle: handle.to_string(),
                        path: path.to_path_buf(),
                    }
                } else {
                    BirdsyncError::Io(e)
                }
            })?;

        write!(file, "{}", std::process::id())?;

        debug!(handle = %handle, path = %path.display(), "Acquired lock");

        Ok(Self {
            path: path.to_path_buf(),
            handle: handle.to_string(),
        })
    }

    /// Returns the marker path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(handle = %self.handle, path = %self.path.display(), "Released lock");
            }
            Err(e) => {
                warn!(
                    handle = %self.handle,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove lock marker"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_writes_pid() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("rs1.lock");

        let guard = LockGuard::acquire(&lock_path, "rs1").unwrap();

        let content = std::fs::read_to_string(&lock_path).unwrap();
        assert_eq!(content, std::process::id().to_string());
        assert_eq!(guard.path(), lock_path);
    }

    #[test]
    fn test_second_acquire_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("rs1.lock");

        let _guard = LockGuard::acquire(&lock_path, "rs1").unwrap();
        let before = std::fs::read_to_string(&lock_path).unwrap();

        let second = LockGuard::acquire(&lock_path, "rs1");
        match second {
            Err(BirdsyncError::LockHeld { handle, path }) => {
                assert_eq!(handle, "rs1");
                assert_eq!(path, lock_path);
            }
            other => panic!("expected LockHeld, got {:?}", other.map(|_| ())),
        }

        // The failed attempt must not touch the existing marker.
        assert_eq!(std::fs::read_to_string(&lock_path).unwrap(), before);
    }

    #[test]
    fn test_drop_removes_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("rs1.lock");

        {
            let _guard = LockGuard::acquire(&lock_path, "rs1").unwrap();
            assert!(lock_path.exists());
        }

        assert!(!lock_path.exists());
    }

    #[test]
    fn test_drop_runs_on_error_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("rs1.lock");

        let attempt = || -> Result<()> {
            let _guard = LockGuard::acquire(&lock_path, "rs1")?;
            Err(BirdsyncError::daemon_start("simulated failure"))
        };

        assert!(attempt().is_err());
        assert!(!lock_path.exists());

        // Reacquirable after the failed run.
        let _guard = LockGuard::acquire(&lock_path, "rs1").unwrap();
    }
}
