//! Stage 8: count reads per gene across all qualifying outputs.

use super::{Dispatch, Stage, StageReport};
use crate::core::{JobOutcome, StageId, WorkCollection};
use crate::errors::{CramflowError, DataIntegrityError, Result};
use crate::external::JobRequest;
use crate::monitor::PendingJobSet;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Pending-set key of the single aggregate job.
pub const AGGREGATE_JOB_KEY: &str = "featurecounts";

const MATRIX_FILE: &str = "featurecounts_matrix.tsv";
const LOG_STEM: &str = "featurecounts_run";

/// Submits one counting job over every validated output in the STAR category
/// set. This stage adds no per-item fields; its checkpoint is its result.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateStage;

impl AggregateStage {
    fn log_path(ctx: &StageContext) -> PathBuf {
        ctx.resolve(StageContext::stage_dir(StageId::Aggregate).join(format!("{LOG_STEM}.o")))
    }
}

#[async_trait]
impl Stage for AggregateStage {
    fn id(&self) -> StageId {
        StageId::Aggregate
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let categories = &ctx.config().alignment.star_categories;
        let bams: Vec<PathBuf> = items
            .iter()
            .filter(|item| item.ready_for_aggregate(categories))
            .filter_map(|item| item.aligned_path.clone())
            .collect();
        if bams.is_empty() {
            return Err(DataIntegrityError::EmptyAggregate.into());
        }

        let dir = StageContext::stage_dir(self.id());
        let request = JobRequest::new(
            AGGREGATE_JOB_KEY,
            dir.join(LOG_STEM),
            ctx.config().resources.aggregate,
            ctx.commands().featurecounts(&dir.join(MATRIX_FILE), &bams),
        );
        ctx.scheduler().submit(&request).await?;
        info!(inputs = bams.len(), "Aggregate job submitted");

        let mut jobs = PendingJobSet::new();
        jobs.insert(AGGREGATE_JOB_KEY, ctx.resolve(&request.stdout_log));
        Ok(Dispatch::AwaitJobs {
            jobs,
            on_result: None,
        })
    }

    fn finish(&self, ctx: &StageContext, _items: &WorkCollection, report: &StageReport) -> Result<()> {
        match report.outcome_of(AGGREGATE_JOB_KEY) {
            Some(JobOutcome::Succeeded) => Ok(()),
            _ => Err(CramflowError::AggregateFailed {
                log: Self::log_path(ctx),
            }),
        }
    }
}
