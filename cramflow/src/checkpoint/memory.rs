//! In-memory checkpoint store.

use super::{CheckpointStore, StageCheckpoint};
use crate::core::WorkCollection;
use crate::errors::CheckpointError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Keeps encoded checkpoints in memory.
///
/// Checkpoints still go through the JSON envelope so that anything a
/// [`FileCheckpointStore`](super::FileCheckpointStore) would reject is
/// rejected here too.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCheckpointStore {
    entries: Arc<Mutex<BTreeMap<usize, Vec<u8>>>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stage indices that have checkpoints.
    #[must_use]
    pub fn stages(&self) -> Vec<usize> {
        self.entries.lock().keys().copied().collect()
    }

    /// Removes a stage's checkpoint.
    pub fn remove(&self, stage: usize) {
        self.entries.lock().remove(&stage);
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn exists(&self, stage: usize) -> bool {
        self.entries.lock().contains_key(&stage)
    }

    async fn load(&self, stage: usize) -> Result<Option<WorkCollection>, CheckpointError> {
        let bytes = self.entries.lock().get(&stage).cloned();
        bytes
            .map(|b| StageCheckpoint::from_json(stage, &b).map(|c| c.items))
            .transpose()
    }

    async fn save(&self, stage: usize, items: &WorkCollection) -> Result<(), CheckpointError> {
        let bytes = StageCheckpoint::new(stage, items.clone())?.to_json()?;
        self.entries.lock().insert(stage, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkItem;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = InMemoryCheckpointStore::new();
        let items =
            WorkCollection::from_items(vec![WorkItem::discovered("a.cram", "/seq/1", "1", false)])
                .unwrap();

        store.save(0, &items).await.unwrap();
        store.save(2, &items).await.unwrap();

        assert_eq!(store.stages(), vec![0, 2]);
        assert_eq!(store.load(2).await.unwrap(), Some(items));
        assert!(store.load(1).await.unwrap().is_none());

        store.remove(2);
        assert!(!store.exists(2).await);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = InMemoryCheckpointStore::new();
        let view = store.clone();
        let items = WorkCollection::default();

        tokio_test::assert_ok!(tokio_test::block_on(store.save(4, &items)));
        assert!(tokio_test::block_on(view.exists(4)));
        assert_eq!(view.stages(), vec![4]);
    }
}
