//! Checkpointer (§4.10.4): a full directory snapshot plus a versioned
//! manifest, taken every `generation.checkpoint_summary_interval` ticks.
//!
//! Grounded on `syn_director::persistence`'s `DirectorSnapshot` /
//! `serialize_snapshot` / `deserialize_snapshot`: a 4-byte magic, a 4-byte
//! little-endian format version, then the snapshot body as JSON. Adapted
//! here to `SDCP` and a `(ProjectState, PlotOutline)` pair instead of
//! `DirectorState`. Restore is an operator action between runs, not exposed
//! through the tick state machine.

use std::fs;
use std::path::{Path, PathBuf};

use sd_core::model::plot::PlotOutline;
use sd_core::model::ProjectState;
use sd_store::ProjectPaths;
use serde::{Deserialize, Serialize};

pub const CHECKPOINT_MAGIC: [u8; 4] = *b"SDCP";
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    pub state: ProjectState,
    pub plot_outline: PlotOutline,
    pub format_version: u32,
}

impl CheckpointSnapshot {
    pub fn new(state: ProjectState, plot_outline: PlotOutline) -> Self {
        CheckpointSnapshot { state, plot_outline, format_version: CHECKPOINT_FORMAT_VERSION }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("invalid checkpoint magic bytes")]
    InvalidMagic,
    #[error("unsupported checkpoint format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("checkpoint manifest is truncated")]
    Truncated,
    #[error("checkpoint json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn serialize_checkpoint(snapshot: &CheckpointSnapshot) -> Result<Vec<u8>, CheckpointError> {
    let body = serde_json::to_vec(snapshot)?;
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&CHECKPOINT_MAGIC);
    out.extend_from_slice(&CHECKPOINT_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn deserialize_checkpoint(bytes: &[u8]) -> Result<CheckpointSnapshot, CheckpointError> {
    if bytes.len() < 8 {
        return Err(CheckpointError::Truncated);
    }
    if bytes[0..4] != CHECKPOINT_MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != CHECKPOINT_FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version, expected: CHECKPOINT_FORMAT_VERSION });
    }
    Ok(serde_json::from_slice(&bytes[8..])?)
}

/// Recursively copy `src` into `dest`, skipping `exclude` (an absolute path
/// compared directly against each entry) if present. Used both to take a
/// snapshot (excluding the `checkpoints/` directory itself, to avoid
/// recursing into it) and to restore one (no exclusion).
fn copy_tree(src: &Path, dest: &Path, exclude: Option<&Path>) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        if Some(path.as_path()) == exclude {
            continue;
        }
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_tree(&path, &target, exclude)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

pub struct Checkpointer<'a> {
    paths: &'a ProjectPaths,
}

impl<'a> Checkpointer<'a> {
    pub fn new(paths: &'a ProjectPaths) -> Self {
        Checkpointer { paths }
    }

    /// No-op when `interval` is zero or `tick` isn't a multiple of it.
    pub fn maybe_checkpoint(
        &self,
        tick: u64,
        interval: u64,
        state: &ProjectState,
        plot_outline: &PlotOutline,
    ) -> Result<bool, CheckpointError> {
        if interval == 0 || tick % interval != 0 {
            return Ok(false);
        }
        self.checkpoint(tick, state, plot_outline)?;
        Ok(true)
    }

    pub fn checkpoint(&self, tick: u64, state: &ProjectState, plot_outline: &PlotOutline) -> Result<(), CheckpointError> {
        let dest = self.paths.checkpoint_dir(tick);
        let checkpoints_root = self.paths.root.join("checkpoints");
        copy_tree(&self.paths.root, &dest, Some(&checkpoints_root))?;

        let snapshot = CheckpointSnapshot::new(state.clone(), plot_outline.clone());
        let bytes = serialize_checkpoint(&snapshot)?;
        fs::write(self.paths.checkpoint_manifest(tick), bytes)?;
        tracing::info!(tick, "checkpoint written");
        Ok(())
    }

    pub fn read_manifest(&self, tick: u64) -> Result<CheckpointSnapshot, CheckpointError> {
        let bytes = fs::read(self.paths.checkpoint_manifest(tick))?;
        deserialize_checkpoint(&bytes)
    }

    /// Replaces everything under the project root with the contents of
    /// `checkpoint_tick_{tick}`. An operator action invoked by the CLI
    /// driver between runs — never called from the tick state machine.
    pub fn restore_directory(&self, tick: u64) -> Result<(), CheckpointError> {
        let source = self.paths.checkpoint_dir(tick);
        copy_tree(&source, &self.paths.root, None)?;
        Ok(())
    }

    pub fn manifest_path(&self, tick: u64) -> PathBuf {
        self.paths.checkpoint_manifest(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::time::Tick;
    use tempfile::tempdir;

    #[test]
    fn roundtrips_through_serialize_and_deserialize() {
        let snapshot = CheckpointSnapshot::new(ProjectState::new("Ashwake", "a1b2c3d4"), PlotOutline::default());
        let bytes = serialize_checkpoint(&snapshot).unwrap();
        let restored = deserialize_checkpoint(&bytes).unwrap();
        assert_eq!(restored.state.novel_name, "Ashwake");
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut bytes = serialize_checkpoint(&CheckpointSnapshot::new(ProjectState::new("Ashwake", "x"), PlotOutline::default())).unwrap();
        bytes[0] = 0x00;
        assert!(matches!(deserialize_checkpoint(&bytes), Err(CheckpointError::InvalidMagic)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = serialize_checkpoint(&CheckpointSnapshot::new(ProjectState::new("Ashwake", "x"), PlotOutline::default())).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(deserialize_checkpoint(&bytes), Err(CheckpointError::UnsupportedVersion { found: 99, .. })));
    }

    #[test]
    fn rejects_truncated_data() {
        assert!(matches!(deserialize_checkpoint(&[0x53, 0x44]), Err(CheckpointError::Truncated)));
    }

    #[test]
    fn checkpoint_copies_the_project_tree_without_recursing_into_itself() {
        let dir = tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        fs::create_dir_all(paths.memory_dir()).unwrap();
        fs::write(paths.state(), b"{}").unwrap();

        let checkpointer = Checkpointer::new(&paths);
        let state = ProjectState::new("Ashwake", "a1b2c3d4");
        let outline = PlotOutline::default();
        checkpointer.checkpoint(1, &state, &outline).unwrap();

        let snapshot_state_file = paths.checkpoint_dir(1).join("state.json");
        assert!(snapshot_state_file.exists());
        assert!(paths.checkpoint_manifest(1).exists());
        assert!(!paths.checkpoint_dir(1).join("checkpoints").exists());
    }

    #[test]
    fn maybe_checkpoint_is_a_no_op_off_interval() {
        let dir = tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        fs::create_dir_all(&paths.root).unwrap();
        let checkpointer = Checkpointer::new(&paths);
        let took = checkpointer
            .maybe_checkpoint(3, 10, &ProjectState::new("Ashwake", "x"), &PlotOutline::default())
            .unwrap();
        assert!(!took);
        assert!(!paths.checkpoint_dir(3).exists());
    }

    #[test]
    fn tick_zero_with_nonzero_interval_always_takes_a_checkpoint() {
        let dir = tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        fs::create_dir_all(&paths.root).unwrap();
        let checkpointer = Checkpointer::new(&paths);
        let took = checkpointer
            .maybe_checkpoint(0, 10, &ProjectState::new("Ashwake", "x"), &PlotOutline::default())
            .unwrap();
        assert!(took);
    }
}
