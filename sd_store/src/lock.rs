//! Advisory exclusive lock over a project directory, held for the
//! duration of one tick (SPEC_FULL.md §5, resolving the concurrent-tick
//! open question left unspecified by the distilled spec's §9).

use sd_core::errors::{StoreError, StoreResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// RAII guard: the lock file is removed when this value is dropped,
/// regardless of whether the tick succeeded or failed.
pub struct ProjectLock {
    path: PathBuf,
}

impl ProjectLock {
    /// Acquire the lock at `lock_path`, failing with `ProjectLocked` if it
    /// already exists (held by another process, or left behind by a crash
    /// that didn't run the `Drop` guard).
    pub fn acquire(lock_path: &Path) -> StoreResult<Self> {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StoreError::ProjectLocked(lock_path.display().to_string())
                } else {
                    StoreError::Io(e)
                }
            })?;
        let _ = write!(file, "{}", std::process::id());
        Ok(ProjectLock { path: lock_path.to_path_buf() })
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquiring_twice_fails_while_held() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        let first = ProjectLock::acquire(&lock_path).unwrap();
        let second = ProjectLock::acquire(&lock_path);
        assert!(matches!(second, Err(StoreError::ProjectLocked(_))));
        drop(first);
    }

    #[test]
    fn lock_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        {
            let _lock = ProjectLock::acquire(&lock_path).unwrap();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        {
            let _lock = ProjectLock::acquire(&lock_path).unwrap();
        }
        let _second = ProjectLock::acquire(&lock_path).unwrap();
    }
}
