//! Stage trait and the nine pipeline stages.
//!
//! A stage does its synchronous work in [`Stage::submit`] and tells the driver
//! what, if anything, remains outstanding through a [`Dispatch`]. The driver
//! owns waiting, applying results and checkpointing, so the stages only
//! describe per-item work.

mod aggregate;
mod align;
mod discover;
mod download;
mod extract;
mod index_bam;
mod link;
mod metadata;
mod validate;

pub use aggregate::{AggregateStage, AGGREGATE_JOB_KEY};
pub use align::AlignStage;
pub use discover::DiscoverStage;
pub use download::DownloadStage;
pub use extract::ExtractStage;
pub use index_bam::IndexStage;
pub use link::LinkStage;
pub use metadata::MetadataStage;
pub use validate::ValidateStage;

use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::monitor::PendingJobSet;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::sync::Arc;

/// Applies one job outcome to the item it belongs to.
pub type ResultHandler = fn(&mut WorkItem, JobOutcome);

/// One unit of local parallel work.
pub struct FanOutTask {
    /// Position of the item the task belongs to.
    pub position: usize,
    /// The work itself. It owns everything it needs.
    pub future: BoxFuture<'static, JobOutcome>,
}

impl FanOutTask {
    /// Creates a task for the item at `position`.
    pub fn new(
        position: usize,
        future: impl std::future::Future<Output = JobOutcome> + Send + 'static,
    ) -> Self {
        Self {
            position,
            future: Box::pin(future),
        }
    }
}

impl Debug for FanOutTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutTask")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// What a stage left outstanding after submission.
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing to wait for.
    Complete,
    /// Batch jobs to monitor. Keys are item ids, except for collection-level
    /// jobs which have no handler.
    AwaitJobs {
        /// Submitted jobs.
        jobs: PendingJobSet,
        /// Applied to the item whose id is the job key.
        on_result: Option<ResultHandler>,
    },
    /// Local tasks to run concurrently behind a barrier.
    FanOut {
        /// One task per eligible item.
        tasks: Vec<FanOutTask>,
        /// Applied to each task's item after the barrier.
        on_result: ResultHandler,
    },
}

/// Job outcomes the driver observed for one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Keys of jobs or items that succeeded.
    pub succeeded: Vec<String>,
    /// Keys of jobs or items that failed.
    pub failed: Vec<String>,
}

impl StageReport {
    /// Records one outcome.
    pub fn record(&mut self, key: impl Into<String>, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded.push(key.into()),
            JobOutcome::Failed => self.failed.push(key.into()),
        }
    }

    /// Returns the outcome recorded for `key`, if any.
    #[must_use]
    pub fn outcome_of(&self, key: &str) -> Option<JobOutcome> {
        if self.succeeded.iter().any(|k| k == key) {
            Some(JobOutcome::Succeeded)
        } else if self.failed.iter().any(|k| k == key) {
            Some(JobOutcome::Failed)
        } else {
            None
        }
    }
}

/// A pipeline stage.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Which stage this is.
    fn id(&self) -> StageId;

    /// Does the stage's synchronous work and submits its jobs.
    ///
    /// # Errors
    ///
    /// Any error is fatal: the run stops and no checkpoint is written.
    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch>;

    /// Runs after every outstanding job or task has finished.
    ///
    /// # Errors
    ///
    /// An error here is fatal and prevents the checkpoint.
    fn finish(
        &self,
        _ctx: &StageContext,
        _items: &WorkCollection,
        _report: &StageReport,
    ) -> Result<()> {
        Ok(())
    }
}

/// All nine stages in order.
#[must_use]
pub fn standard_stages() -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(DiscoverStage),
        Arc::new(DownloadStage),
        Arc::new(MetadataStage),
        Arc::new(ExtractStage),
        Arc::new(LinkStage),
        Arc::new(AlignStage),
        Arc::new(ValidateStage),
        Arc::new(IndexStage),
        Arc::new(AggregateStage),
    ]
}
