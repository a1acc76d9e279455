//! Runs one stage: resume from its checkpoint, or execute and checkpoint it.

use super::fanout::run_barrier;
use super::StageContext;
use crate::checkpoint::CheckpointStore;
use crate::core::WorkCollection;
use crate::errors::{CheckpointError, CramflowError, Result};
use crate::monitor::{JobMonitor, MonitorOutcome};
use crate::stages::{Dispatch, Stage, StageReport};
use std::sync::Arc;
use tracing::{info, warn};

/// How a stage run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRun {
    /// The checkpoint existed and was loaded; nothing was executed.
    Resumed,
    /// The stage executed and its checkpoint was written.
    Completed {
        /// Job and task outcomes seen while the stage ran.
        report: StageReport,
    },
}

/// Drives single stages against a checkpoint store and a job monitor.
#[derive(Clone)]
pub struct StageDriver {
    store: Arc<dyn CheckpointStore>,
    monitor: JobMonitor,
}

impl StageDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(store: Arc<dyn CheckpointStore>, monitor: JobMonitor) -> Self {
        Self { store, monitor }
    }

    /// The checkpoint store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Runs `stage` over `items`.
    ///
    /// If the stage's checkpoint exists, `items` is replaced by its contents
    /// and the stage body is never touched. Otherwise the stage submits its
    /// work, the driver waits for it, applies each outcome through the
    /// stage's handler and writes the checkpoint.
    ///
    /// # Errors
    ///
    /// Every error is fatal. No checkpoint is written for a stage that fails.
    pub async fn run(
        &self,
        stage: &dyn Stage,
        ctx: &StageContext,
        items: &mut WorkCollection,
    ) -> Result<StageRun> {
        let id = stage.id();
        let index = id.index();
        let events = ctx.events();

        if self.store.exists(index).await {
            let restored = self
                .store
                .load(index)
                .await?
                .ok_or(CheckpointError::Missing(index))?;
            info!(stage = %id, items = restored.len(), "Checkpoint exists, loading progress");
            *items = restored;
            events
                .emit(
                    "stage.resumed",
                    Some(serde_json::json!({ "stage": index, "name": id.name() })),
                )
                .await;
            return Ok(StageRun::Resumed);
        }

        info!(stage = %id, "Starting stage");
        events
            .emit(
                "stage.started",
                Some(serde_json::json!({ "stage": index, "name": id.name() })),
            )
            .await;
        if let Some(dir) = id.output_dir() {
            tokio::fs::create_dir_all(ctx.resolve(dir)).await?;
        }

        let mut report = StageReport::default();
        match stage.submit(ctx, items).await? {
            Dispatch::Complete => {}
            Dispatch::AwaitJobs { jobs, on_result } => {
                info!(stage = %id, jobs = jobs.len(), "Waiting for batch jobs");
                let outcome = self
                    .monitor
                    .await_completion(jobs, |key, outcome| {
                        report.record(key, outcome);
                        let Some(handler) = on_result else {
                            return;
                        };
                        match items.get_mut(key) {
                            Some(item) => handler(item, outcome),
                            None => warn!(key, "Finished job matches no work item"),
                        }
                    })
                    .await;
                if let MonitorOutcome::DeadlineExceeded { still_pending, .. } = outcome {
                    return Err(CramflowError::MonitorDeadline {
                        stage: id.name().to_string(),
                        pending: still_pending,
                    });
                }
            }
            Dispatch::FanOut { tasks, on_result } => {
                info!(stage = %id, tasks = tasks.len(), "Running local tasks");
                for (position, outcome) in run_barrier(tasks).await {
                    let Some(item) = items.get_mut_at(position) else {
                        continue;
                    };
                    report.record(item.id.clone(), outcome);
                    on_result(item, outcome);
                }
            }
        }

        stage.finish(ctx, items, &report)?;

        self.store.save(index, items).await?;
        info!(
            stage = %id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Stage complete"
        );
        events
            .emit(
                "stage.checkpointed",
                Some(serde_json::json!({
                    "stage": index,
                    "name": id.name(),
                    "succeeded": report.succeeded.len(),
                    "failed": report.failed.len(),
                })),
            )
            .await;
        Ok(StageRun::Completed { report })
    }
}

impl std::fmt::Debug for StageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDriver")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
