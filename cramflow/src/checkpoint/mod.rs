//! Durable per-stage snapshots of the work-item collection.
//!
//! A checkpoint for stage N is written exactly once, after stage N has fully
//! resolved. Its presence is the only resumption signal: when it exists the
//! stage body is skipped and the collection is replaced by its contents.

mod file;
mod memory;

pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;

use crate::core::{StageId, WorkCollection};
use crate::errors::CheckpointError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Storage backend for stage checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns true if a checkpoint exists for the stage.
    async fn exists(&self, stage: usize) -> bool;

    /// Loads the collection saved for the stage, if any.
    async fn load(&self, stage: usize) -> Result<Option<WorkCollection>, CheckpointError>;

    /// Saves the collection for the stage. All-or-nothing.
    async fn save(&self, stage: usize, items: &WorkCollection) -> Result<(), CheckpointError>;
}

/// On-disk checkpoint envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCheckpoint {
    /// The stage this snapshot was taken after.
    pub stage_index: usize,
    /// Human-readable stage name.
    pub stage_name: String,
    /// When the snapshot was written.
    pub written_at: DateTime<Utc>,
    /// SHA-256 of the serialized items, hex encoded.
    pub digest: String,
    /// The full collection.
    pub items: WorkCollection,
}

impl StageCheckpoint {
    /// Wraps a collection for the given stage.
    pub fn new(stage_index: usize, items: WorkCollection) -> Result<Self, CheckpointError> {
        let digest = digest_items(stage_index, &items)?;
        Ok(Self {
            stage_index,
            stage_name: StageId::from_index(stage_index)
                .map_or_else(|| format!("stage_{stage_index}"), |s| s.name().to_string()),
            written_at: Utc::now(),
            digest,
            items,
        })
    }

    /// Encodes the envelope as pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec_pretty(self).map_err(|e| CheckpointError::Serialization {
            stage: self.stage_index,
            message: e.to_string(),
        })
    }

    /// Decodes an envelope and checks it belongs to `stage` and is intact.
    pub fn from_json(stage: usize, bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self =
            serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization {
                stage,
                message: e.to_string(),
            })?;
        if checkpoint.stage_index != stage {
            return Err(CheckpointError::StageMismatch {
                expected: stage,
                found: checkpoint.stage_index,
            });
        }
        if digest_items(stage, &checkpoint.items)? != checkpoint.digest {
            return Err(CheckpointError::DigestMismatch { stage });
        }
        Ok(checkpoint)
    }
}

fn digest_items(stage: usize, items: &WorkCollection) -> Result<String, CheckpointError> {
    let bytes = serde_json::to_vec(items).map_err(|e| CheckpointError::Serialization {
        stage,
        message: e.to_string(),
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
