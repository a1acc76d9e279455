//! Stage 1: fetch each file from the archive.

use super::{Dispatch, Stage};
use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::external::JobRequest;
use crate::monitor::PendingJobSet;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use tracing::info;

/// Submits one archive fetch job per existing, non-control file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStage;

#[async_trait]
impl Stage for DownloadStage {
    fn id(&self) -> StageId {
        StageId::Download
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let dir = StageContext::stage_dir(self.id());
        let resources = ctx.config().resources.fetch;
        let mut jobs = PendingJobSet::new();

        for position in items.positions_where(|item| item.ready_for_download()) {
            let Some(item) = items.get_mut_at(position) else {
                continue;
            };
            let destination = dir.join(&item.id);
            let request = JobRequest::new(
                item.id.clone(),
                dir.join(format!("1_fetch_{}", item.file_stem())),
                resources,
                ctx.archive().fetch_command(&item.source_location, &destination),
            );
            ctx.scheduler().submit(&request).await?;

            item.local_path = Some(destination);
            jobs.insert(item.id.clone(), ctx.resolve(&request.stdout_log));
        }

        info!(submitted = jobs.len(), "Fetch jobs submitted");
        Ok(Dispatch::AwaitJobs {
            jobs,
            on_result: Some(record_download),
        })
    }
}

fn record_download(item: &mut WorkItem, outcome: JobOutcome) {
    item.download_success = outcome.is_success();
}
