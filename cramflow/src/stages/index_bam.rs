//! Stage 7: index validated output.

use super::{Dispatch, FanOutTask, Stage};
use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::pipeline::StageContext;
use async_trait::async_trait;

/// Indexes every validated output concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStage;

#[async_trait]
impl Stage for IndexStage {
    fn id(&self) -> StageId {
        StageId::Index
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let mut tasks = Vec::new();
        for position in items.positions_where(|item| item.ready_for_indexing()) {
            let Some(bam) = items.get_at(position).and_then(|item| item.aligned_path.clone()) else {
                continue;
            };
            let tools = ctx.tools().clone();
            tasks.push(FanOutTask::new(position, async move { tools.index(bam).await }));
        }

        Ok(Dispatch::FanOut {
            tasks,
            on_result: record_index,
        })
    }
}

fn record_index(item: &mut WorkItem, outcome: JobOutcome) {
    item.index_success = outcome.is_success();
}
