//! Everything a stage may use while it runs.

use crate::config::PipelineConfig;
use crate::core::StageId;
use crate::errors::{ConfigError, Result};
use crate::events::{EventSink, LoggingEventSink};
use crate::external::{
    ArchiveClient, BatchScheduler, CommandRunner, IrodsArchive, LocalTools, LsfScheduler,
    SamtoolsTools, TokioCommandRunner, ToolCommands,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, read-only inputs of one pipeline invocation.
///
/// Paths stored on work items are relative to `work_dir`; external jobs run
/// from there, so [`StageContext::resolve`] is only needed for local file
/// access.
#[derive(Clone)]
pub struct StageContext {
    config: Arc<PipelineConfig>,
    run_id: String,
    lane: String,
    work_dir: PathBuf,
    archive: Arc<dyn ArchiveClient>,
    scheduler: Arc<dyn BatchScheduler>,
    tools: Arc<dyn LocalTools>,
    events: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a context wired to iRODS, LSF and samtools.
    ///
    /// # Errors
    ///
    /// Returns an error if the run or lane id is blank.
    pub fn new(
        config: PipelineConfig,
        run_id: impl Into<String>,
        lane: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let run_id = run_id.into().trim().to_string();
        let lane = lane.into().trim().to_string();
        if run_id.is_empty() {
            return Err(ConfigError::MissingArgument("run").into());
        }
        if lane.is_empty() {
            return Err(ConfigError::MissingArgument("lane").into());
        }

        let work_dir = work_dir.into();
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        let archive = Arc::new(IrodsArchive::new(runner.clone(), config.archive.clone()));
        let scheduler = Arc::new(LsfScheduler::new(runner.clone(), work_dir.clone()));
        let tools = Arc::new(SamtoolsTools::new(
            runner,
            config.tools.samtools.clone(),
            work_dir.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            run_id,
            lane,
            work_dir,
            archive,
            scheduler,
            tools,
            events: Arc::new(LoggingEventSink::default()),
        })
    }

    /// Replaces the archive client.
    #[must_use]
    pub fn with_archive(mut self, archive: Arc<dyn ArchiveClient>) -> Self {
        self.archive = archive;
        self
    }

    /// Replaces the batch scheduler.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn BatchScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replaces the local tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn LocalTools>) -> Self {
        self.tools = tools;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The run being processed.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The lane being processed.
    #[must_use]
    pub fn lane(&self) -> &str {
        &self.lane
    }

    /// The working directory all relative paths hang off.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The archive client.
    #[must_use]
    pub fn archive(&self) -> &Arc<dyn ArchiveClient> {
        &self.archive
    }

    /// The batch scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn BatchScheduler> {
        &self.scheduler
    }

    /// The local tools.
    #[must_use]
    pub fn tools(&self) -> &Arc<dyn LocalTools> {
        &self.tools
    }

    /// The event sink.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Command line builders for the configured tools.
    #[must_use]
    pub fn commands(&self) -> ToolCommands<'_> {
        ToolCommands::new(&self.config.tools)
    }

    /// Turns a work-dir-relative path into one usable from this process.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(relative)
    }

    /// The relative output directory of a stage.
    #[must_use]
    pub fn stage_dir(stage: StageId) -> PathBuf {
        PathBuf::from(stage.output_dir().unwrap_or_default())
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.run_id)
            .field("lane", &self.lane)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}
