//! Stage 5: realign reads with the tool chosen by category.

use super::{Dispatch, Stage};
use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::external::{Aligner, JobRequest};
use crate::monitor::PendingJobSet;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use tracing::{debug, info};

/// Submits one alignment job per linked item whose category maps to an aligner.
///
/// Items in a category neither aligner is configured for are skipped without
/// comment beyond a debug line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignStage;

#[async_trait]
impl Stage for AlignStage {
    fn id(&self) -> StageId {
        StageId::Align
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let dir = StageContext::stage_dir(self.id());
        let resources = ctx.config().resources.align;
        let mut jobs = PendingJobSet::new();

        for position in items.positions_where(|item| item.ready_for_alignment()) {
            let Some(item) = items.get_mut_at(position) else {
                continue;
            };
            let (Some(category), Some(category_dir), Some(label), Some(read_1), Some(read_2)) = (
                item.category.as_deref(),
                item.category_dir(),
                item.label.as_deref(),
                item.linked_path_1.as_deref(),
                item.linked_path_2.as_deref(),
            ) else {
                continue;
            };
            let Some(aligner) = Aligner::for_category(&ctx.config().alignment, category) else {
                debug!(id = %item.id, category, "No aligner for category, skipping");
                continue;
            };

            let out_dir = dir.join(category_dir);
            tokio::fs::create_dir_all(ctx.resolve(&out_dir)).await?;
            let bam = out_dir.join(format!("{label}.bam"));
            let command = match aligner {
                Aligner::Star => ctx.commands().star_align(
                    read_1,
                    read_2,
                    &out_dir.join(format!("{}.", item.file_stem())),
                    &bam,
                ),
                Aligner::Bwa => ctx.commands().bwa_align(read_1, read_2, &bam),
            };
            let request = JobRequest::new(
                item.id.clone(),
                out_dir.join(format!("5_realignment_{label}")),
                resources,
                command,
            );
            ctx.scheduler().submit(&request).await?;

            item.aligned_path = Some(bam);
            jobs.insert(item.id.clone(), ctx.resolve(&request.stdout_log));
        }

        info!(submitted = jobs.len(), "Alignment jobs submitted");
        Ok(Dispatch::AwaitJobs {
            jobs,
            on_result: Some(record_alignment),
        })
    }
}

fn record_alignment(item: &mut WorkItem, outcome: JobOutcome) {
    item.alignment_success = outcome.is_success();
}
