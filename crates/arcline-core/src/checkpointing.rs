//! On-disk checkpoint persistence: per-stage cursor JSON under
//! `logs/checkpoints/<phase>.json`, written atomically (write-to-temp,
//! rename). Grounded in `original_source/core/checkpoint.py`'s
//! `CheckpointManager`, carried over into the atomic-rename idiom used by
//! `dashflow::checkpoint::CheckpointWithIntegrity`'s write path.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::Checkpoint;
use crate::error::{PipelineError, Result};

/// Reads and atomically writes one stage's checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    checkpoint_dir: PathBuf,
}

impl CheckpointStore {
    /// `checkpoint_dir` is typically `logs/checkpoints` (spec §6).
    #[must_use]
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    fn path_for(&self, phase: &str) -> PathBuf {
        self.checkpoint_dir.join(format!("{phase}.json"))
    }

    /// Load the checkpoint for `phase`, or a fresh one if the file is
    /// absent. A corrupt file is treated as fatal config (spec §7's
    /// testable property: checkpoint files, when present, must parse).
    pub fn load(&self, phase: &str) -> Result<Checkpoint> {
        let path = self.path_for(phase);
        if !path.exists() {
            return Ok(Checkpoint::fresh());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::Transient(format!("reading checkpoint {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PipelineError::FatalConfig(format!(
                "checkpoint {} does not parse as JSON: {e}",
                path.display()
            ))
        })
    }

    /// Atomically persist `checkpoint` for `phase`: write to a sibling
    /// `.tmp` file, then rename over the real path.
    pub fn save(&self, phase: &str, checkpoint: &Checkpoint) -> Result<()> {
        std::fs::create_dir_all(&self.checkpoint_dir).map_err(|e| {
            PipelineError::Transient(format!(
                "creating checkpoint dir {}: {e}",
                self.checkpoint_dir.display()
            ))
        })?;

        let path = self.path_for(phase);
        let tmp_path = path.with_extension("tmp");
        let body = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| PipelineError::Transient(format!("serializing checkpoint: {e}")))?;

        std::fs::write(&tmp_path, body).map_err(|e| {
            PipelineError::Transient(format!("writing checkpoint tmp file: {e}"))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            PipelineError::Transient(format!("renaming checkpoint into place: {e}"))
        })?;
        Ok(())
    }

    /// Advance and persist in one call — the common per-item path in the
    /// runner (spec §4.9 step 4).
    pub fn advance_and_save(
        &self,
        phase: &str,
        checkpoint: &mut Checkpoint,
        item_id: impl Into<String>,
        succeeded: bool,
    ) -> Result<()> {
        checkpoint.advance(item_id, succeeded, Utc::now());
        self.save(phase, checkpoint)
    }

    /// Clear the checkpoint file after a successful full drain (spec §4.9
    /// step 5; batch mode never calls this).
    pub fn clear(&self, phase: &str) -> Result<()> {
        let path = self.path_for(phase);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| PipelineError::Transient(format!("clearing checkpoint: {e}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut cp = Checkpoint::fresh();
        store
            .advance_and_save("p2", &mut cp, "title-1", true)
            .unwrap();

        let reloaded = store.load("p2").unwrap();
        assert_eq!(reloaded.processed_count, 1);
        assert_eq!(reloaded.last_item_id.as_deref(), Some("title-1"));
        assert_eq!(reloaded.counters.succeeded, 1);

        // No stray .tmp file left behind.
        assert!(!dir.path().join("p2.tmp").exists());
    }

    #[test]
    fn missing_file_is_a_fresh_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let cp = store.load("p3").unwrap();
        assert_eq!(cp, Checkpoint::fresh());
    }

    #[test]
    fn corrupt_file_is_fatal_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p4.json"), "not json").unwrap();
        let store = CheckpointStore::new(dir.path());
        let err = store.load("p4").unwrap_err();
        assert!(matches!(err, PipelineError::FatalConfig(_)));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let mut cp = Checkpoint::fresh();
        store.advance_and_save("p2", &mut cp, "t1", true).unwrap();
        store.clear("p2").unwrap();
        assert!(!dir.path().join("p2.json").exists());
    }
}
