//! Batch job submission.

use super::runner::{CommandRunner, ProcessCommand};
use crate::config::JobResources;
use crate::errors::SubmissionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A shell pipeline of one or more commands, each given as an argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    parts: Vec<Vec<String>>,
}

impl JobCommand {
    /// Starts a pipeline with a single command.
    #[must_use]
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: vec![argv.into_iter().map(Into::into).collect()],
        }
    }

    /// Pipes the output of the pipeline so far into another command.
    #[must_use]
    pub fn pipe<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts.push(argv.into_iter().map(Into::into).collect());
        self
    }

    /// The commands of the pipeline.
    #[must_use]
    pub fn parts(&self) -> &[Vec<String>] {
        &self.parts
    }

    /// Renders the pipeline as a single shell line.
    #[must_use]
    pub fn render(&self) -> String {
        self.parts
            .iter()
            .map(shell_words::join)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// One job to hand to the batch scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Work item id or other stage-chosen key.
    pub key: String,
    /// Scheduler stdout log, relative to the working directory. This is the
    /// log the monitor polls.
    pub stdout_log: PathBuf,
    /// Scheduler stderr log, relative to the working directory.
    pub stderr_log: PathBuf,
    /// Memory and cores to request.
    pub resources: JobResources,
    /// What the job runs.
    pub command: JobCommand,
}

impl JobRequest {
    /// Creates a request whose logs are `<log_stem>.o` and `<log_stem>.e`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        log_stem: impl AsRef<Path>,
        resources: JobResources,
        command: JobCommand,
    ) -> Self {
        let stem = log_stem.as_ref();
        let with_suffix = |suffix: &str| {
            let mut path = stem.as_os_str().to_owned();
            path.push(suffix);
            PathBuf::from(path)
        };
        Self {
            key: key.into(),
            stdout_log: with_suffix(".o"),
            stderr_log: with_suffix(".e"),
            resources,
            command,
        }
    }
}

/// Accepts jobs for asynchronous execution.
///
/// `submit` returning `Ok` only means the job was queued; its outcome is
/// learned later from the stdout log.
#[async_trait]
pub trait BatchScheduler: Send + Sync {
    /// Queues one job.
    async fn submit(&self, request: &JobRequest) -> Result<(), SubmissionError>;
}

/// Submits jobs to LSF with `bsub`.
#[derive(Clone)]
pub struct LsfScheduler {
    runner: Arc<dyn CommandRunner>,
    work_dir: PathBuf,
    program: String,
}

impl LsfScheduler {
    /// Creates a scheduler that runs `bsub` from `work_dir`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            work_dir: work_dir.into(),
            program: "bsub".to_string(),
        }
    }

    /// Builds the `bsub` invocation for a request.
    #[must_use]
    pub fn command_for(&self, request: &JobRequest) -> ProcessCommand {
        let memory = request.resources.memory_mb;
        ProcessCommand::new(&self.program)
            .arg("-o")
            .arg(request.stdout_log.display().to_string())
            .arg("-e")
            .arg(request.stderr_log.display().to_string())
            .arg("-R")
            .arg(format!("select[mem>{memory}] rusage[mem={memory}]"))
            .arg("-M")
            .arg(memory.to_string())
            .arg("-n")
            .arg(request.resources.cores.to_string())
            .arg(request.command.render())
            .current_dir(&self.work_dir)
    }
}

#[async_trait]
impl BatchScheduler for LsfScheduler {
    async fn submit(&self, request: &JobRequest) -> Result<(), SubmissionError> {
        let command = self.command_for(request);
        let output = self.runner.run(command.clone()).await?;
        let output = output.check(&format!("Submit job for {}", request.key), &command)?;
        debug!(key = %request.key, response = %output.stdout.trim(), "Job submitted");
        Ok(())
    }
}

impl std::fmt::Debug for LsfScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LsfScheduler")
            .field("work_dir", &self.work_dir)
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}
