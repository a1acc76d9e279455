//! Checkpoints as JSON files in a directory.

use super::{CheckpointStore, StageCheckpoint};
use crate::core::WorkCollection;
use crate::errors::CheckpointError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Stores one `checkpoint_<n>.json` file per stage.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated checkpoint behind.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding the checkpoints.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the checkpoint path for a stage.
    #[must_use]
    pub fn path_for(&self, stage: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_{stage}.json"))
    }

    /// Reads the full envelope for a stage, including its metadata.
    pub async fn read_envelope(
        &self,
        stage: usize,
    ) -> Result<Option<StageCheckpoint>, CheckpointError> {
        let path = self.path_for(stage);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CheckpointError::Read { stage, path, source }),
        };
        StageCheckpoint::from_json(stage, &bytes).map(Some)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn exists(&self, stage: usize) -> bool {
        fs::metadata(self.path_for(stage))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn load(&self, stage: usize) -> Result<Option<WorkCollection>, CheckpointError> {
        let envelope = self.read_envelope(stage).await?;
        if let Some(ref checkpoint) = envelope {
            debug!(
                stage,
                written_at = %checkpoint.written_at,
                items = checkpoint.items.len(),
                "Loaded checkpoint"
            );
        }
        Ok(envelope.map(|c| c.items))
    }

    async fn save(&self, stage: usize, items: &WorkCollection) -> Result<(), CheckpointError> {
        let path = self.path_for(stage);
        let bytes = StageCheckpoint::new(stage, items.clone())?.to_json()?;

        let write_err = |source| CheckpointError::Write {
            stage,
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.map_err(write_err)?;
        fs::rename(&tmp, &path).await.map_err(write_err)?;

        info!(stage, path = %path.display(), "Checkpoint saved");
        Ok(())
    }
}
