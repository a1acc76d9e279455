//! A temporary work directory wired to scripted collaborators.

use super::{ManualClock, RecordingScheduler, ScriptedArchive, ScriptedTools};
use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::PipelineConfig;
use crate::events::CollectingEventSink;
use crate::monitor::{FsLogSource, JobMonitor};
use crate::pipeline::{StageContext, StageDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Run id every harness context uses.
pub const TEST_RUN: &str = "35000";
/// Lane every harness context uses.
pub const TEST_LANE: &str = "2";

/// Metadata text in the archive's listing format.
#[must_use]
pub fn metadata_text(category: &str, label: &str) -> String {
    format!(
        "AVUs defined for dataObj:\n\
         attribute: id_run\nvalue: {TEST_RUN}\nunits:\n----\n\
         attribute: library_type\nvalue: {category}\nunits:\n----\n\
         attribute: sample_supplier_name\nvalue: {label}\nunits:\n----\n\
         attribute: type\nvalue: cram\nunits:\n"
    )
}

/// Owns a temporary work directory and the scripted collaborators behind
/// every [`StageContext`] it hands out.
pub struct TestHarness {
    dir: TempDir,
    config: PipelineConfig,
    archive: ScriptedArchive,
    scheduler: Arc<RecordingScheduler>,
    tools: Arc<ScriptedTools>,
    events: Arc<CollectingEventSink>,
}

impl TestHarness {
    /// Creates a harness with default config and an empty archive.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(RecordingScheduler::new(dir.path()));
        Self {
            dir,
            config: PipelineConfig::default(),
            archive: ScriptedArchive::new(),
            scheduler,
            tools: Arc::new(ScriptedTools::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Uses `archive` for every context.
    #[must_use]
    pub fn with_archive(mut self, archive: ScriptedArchive) -> Self {
        self.archive = archive;
        self
    }

    /// Uses `config` for every context and driver.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// A context over the work directory and the scripted collaborators.
    ///
    /// # Panics
    ///
    /// Never in practice; the run and lane are fixed and non-blank.
    #[must_use]
    pub fn context(&self) -> StageContext {
        StageContext::new(self.config.clone(), TEST_RUN, TEST_LANE, self.dir.path())
            .unwrap()
            .with_archive(Arc::new(self.archive.clone()))
            .with_scheduler(self.scheduler.clone())
            .with_tools(self.tools.clone())
            .with_events(self.events.clone())
    }

    /// A driver that reads real job logs but never really sleeps.
    #[must_use]
    pub fn driver(&self, store: Arc<dyn CheckpointStore>) -> StageDriver {
        self.driver_with_deadline(store, self.config.monitor.deadline)
    }

    /// Like [`driver`](Self::driver) with an explicit monitor deadline.
    #[must_use]
    pub fn driver_with_deadline(
        &self,
        store: Arc<dyn CheckpointStore>,
        deadline: impl Into<Option<Duration>>,
    ) -> StageDriver {
        let monitor = JobMonitor::new(Arc::new(FsLogSource), Arc::new(ManualClock::new()))
            .with_markers(self.config.monitor.markers())
            .with_poll_interval(self.config.monitor.poll_interval)
            .with_deadline(deadline.into())
            .with_events(self.events.clone());
        StageDriver::new(store, monitor)
    }

    /// A file checkpoint store under the work directory.
    #[must_use]
    pub fn file_store(&self) -> Arc<FileCheckpointStore> {
        Arc::new(FileCheckpointStore::new(self.checkpoint_dir()))
    }

    /// Where [`file_store`](Self::file_store) keeps its checkpoints.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.dir.path().join("checkpoints")
    }

    /// The work directory.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    /// The scripted archive.
    #[must_use]
    pub fn archive(&self) -> &ScriptedArchive {
        &self.archive
    }

    /// The recording scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &RecordingScheduler {
        &self.scheduler
    }

    /// The scripted local tools.
    #[must_use]
    pub fn tools(&self) -> &ScriptedTools {
        &self.tools
    }

    /// Every event emitted through harness contexts and drivers.
    #[must_use]
    pub fn events(&self) -> &CollectingEventSink {
        &self.events
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::attribute_value;

    #[test]
    fn test_metadata_text_parses_with_default_attributes() {
        let config = PipelineConfig::default();
        let text = metadata_text("GnT scRNA", "PD1234a");
        assert_eq!(
            attribute_value(&text, &config.metadata.category_attribute).as_deref(),
            Some("GnT scRNA")
        );
        assert_eq!(
            attribute_value(&text, &config.metadata.label_attribute).as_deref(),
            Some("PD1234a")
        );
    }

    #[test]
    fn test_context_uses_fixed_run_and_lane() {
        let harness = TestHarness::new();
        let ctx = harness.context();
        assert_eq!(ctx.run_id(), TEST_RUN);
        assert_eq!(ctx.lane(), TEST_LANE);
        assert_eq!(ctx.work_dir(), harness.work_dir());
    }
}
