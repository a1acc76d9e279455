//! Progress summary built from the checkpoints on disk.

use crate::checkpoint::CheckpointStore;
use crate::core::{StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use serde::Serialize;
use std::fmt;

/// Item counts for each per-item flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagCounts {
    /// All items, controls included.
    pub total: usize,
    /// Spike-in controls.
    pub controls: usize,
    /// Confirmed present in the archive.
    pub exists_remote: usize,
    /// Downloaded.
    pub downloaded: usize,
    /// Metadata fetched.
    pub metadata_fetched: usize,
    /// Label parsed from metadata.
    pub metadata_parsed: usize,
    /// Reads extracted.
    pub extracted: usize,
    /// Reads linked into the category layout.
    pub linked: usize,
    /// Realigned.
    pub aligned: usize,
    /// Passed validation.
    pub validated: usize,
    /// Indexed.
    pub indexed: usize,
}

impl FlagCounts {
    /// Counts the flags set across a collection.
    #[must_use]
    pub fn from_collection(items: &WorkCollection) -> Self {
        let count = |flag: fn(&WorkItem) -> bool| items.count_where(flag);
        Self {
            total: items.len(),
            controls: count(|i| i.is_control),
            exists_remote: count(|i| i.exists_remote),
            downloaded: count(|i| i.download_success),
            metadata_fetched: count(|i| i.metadata_fetched),
            metadata_parsed: count(|i| i.metadata_parsed),
            extracted: count(|i| i.extraction_success),
            linked: count(|i| i.linked_path_1.is_some() && i.linked_path_2.is_some()),
            aligned: count(|i| i.alignment_success),
            validated: count(|i| i.validation_success),
            indexed: count(|i| i.index_success),
        }
    }
}

/// Which stages have checkpoints, and what the latest one says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    /// Stages whose checkpoint exists, in order.
    pub checkpointed: Vec<StageId>,
    /// The last checkpointed stage and its counts.
    pub latest: Option<(StageId, FlagCounts)>,
}

impl PipelineStatus {
    /// Reads the status from a checkpoint store.
    ///
    /// # Errors
    ///
    /// Returns an error if the latest checkpoint cannot be loaded.
    pub async fn collect(store: &dyn CheckpointStore) -> Result<Self> {
        let mut checkpointed = Vec::new();
        for stage in StageId::ALL {
            if store.exists(stage.index()).await {
                checkpointed.push(stage);
            }
        }

        let latest = match checkpointed.last() {
            Some(&stage) => store
                .load(stage.index())
                .await?
                .map(|items| (stage, FlagCounts::from_collection(&items))),
            None => None,
        };

        Ok(Self {
            checkpointed,
            latest,
        })
    }

    /// The first stage without a checkpoint, i.e. where a run would resume.
    #[must_use]
    pub fn next_stage(&self) -> Option<StageId> {
        StageId::ALL
            .into_iter()
            .find(|stage| !self.checkpointed.contains(stage))
    }

    /// Returns true if every stage has a checkpoint.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_stage().is_none()
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in StageId::ALL {
            let mark = if self.checkpointed.contains(&stage) { "done" } else { "-" };
            writeln!(f, "{:<16} {mark}", stage.to_string())?;
        }

        match self.next_stage() {
            Some(stage) => writeln!(f, "\nNext stage: {stage}")?,
            None => writeln!(f, "\nAll stages complete")?,
        }

        if let Some((stage, counts)) = &self.latest {
            writeln!(f, "\nItems after stage {stage}:")?;
            let rows = [
                ("total", counts.total),
                ("controls", counts.controls),
                ("exists_remote", counts.exists_remote),
                ("downloaded", counts.downloaded),
                ("metadata_fetched", counts.metadata_fetched),
                ("metadata_parsed", counts.metadata_parsed),
                ("extracted", counts.extracted),
                ("linked", counts.linked),
                ("aligned", counts.aligned),
                ("validated", counts.validated),
                ("indexed", counts.indexed),
            ];
            for (name, value) in rows {
                writeln!(f, "  {name:<18} {value}")?;
            }
        }
        Ok(())
    }
}
