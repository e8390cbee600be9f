//! Atomic write-to-temp-then-rename helper used by every single-file
//! aggregate and per-entity record in the project directory.
//!
//! Adapted from the write-temp/rename pattern used for crash-safe saves in
//! the reference workspace's world-persistence code, but kept synchronous:
//! the tick orchestrator has no concurrency to hide this latency behind
//! (§5 Concurrency & Resource Model).

use crate::errors::{StoreError, StoreResult};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Serialize `value` as pretty JSON and write it to `path` atomically: the
/// bytes land in a sibling `.tmp` file first, which is `fsync`'d and then
/// renamed over `path`. A reader never observes a partially written file.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Write raw bytes to `path` using the same temp-then-rename sequence.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path.parent().ok_or_else(|| {
        StoreError::Invalid(format!("path {} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("atomic-write")
    ));

    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "atomic write");
    Ok(())
}

/// Load and deserialize JSON from `path`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load and deserialize JSON from `path` if it exists, else `None`.
pub fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
