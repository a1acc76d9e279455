//! Stage 3: extract paired reads from each downloaded file.

use super::{Dispatch, Stage};
use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::external::JobRequest;
use crate::monitor::PendingJobSet;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use tracing::info;

/// Submits one read extraction job per file with parsed metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStage;

#[async_trait]
impl Stage for ExtractStage {
    fn id(&self) -> StageId {
        StageId::Extract
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let dir = StageContext::stage_dir(self.id());
        let download_dir = StageContext::stage_dir(StageId::Download);
        let resources = ctx.config().resources.extract;
        let mut jobs = PendingJobSet::new();

        for position in items.positions_where(|item| item.ready_for_extraction()) {
            let Some(item) = items.get_mut_at(position) else {
                continue;
            };
            let stem = item.file_stem().to_string();
            let read_1 = dir.join(format!("{stem}.1.fq.gz"));
            let read_2 = dir.join(format!("{stem}.2.fq.gz"));
            let input = item
                .local_path
                .clone()
                .unwrap_or_else(|| download_dir.join(&item.id));

            let request = JobRequest::new(
                item.id.clone(),
                dir.join(format!("3_cram_to_fastq_{}", item.id)),
                resources,
                ctx.commands().extract(&input, &read_1, &read_2),
            );
            ctx.scheduler().submit(&request).await?;

            item.extracted_path_1 = Some(read_1);
            item.extracted_path_2 = Some(read_2);
            jobs.insert(item.id.clone(), ctx.resolve(&request.stdout_log));
        }

        info!(submitted = jobs.len(), "Extraction jobs submitted");
        Ok(Dispatch::AwaitJobs {
            jobs,
            on_result: Some(record_extraction),
        })
    }
}

fn record_extraction(item: &mut WorkItem, outcome: JobOutcome) {
    item.extraction_success = outcome.is_success();
}
