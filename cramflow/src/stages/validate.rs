//! Stage 6: check realigned output is intact.

use super::{Dispatch, FanOutTask, Stage};
use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
use crate::errors::Result;
use crate::pipeline::StageContext;
use async_trait::async_trait;

/// Runs a local integrity check on every successfully aligned output, all at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateStage;

#[async_trait]
impl Stage for ValidateStage {
    fn id(&self) -> StageId {
        StageId::Validate
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let tasks = items
            .positions_where(|item| item.ready_for_validation())
            .into_iter()
            .filter_map(|position| {
                let bam = items.get_at(position)?.aligned_path.clone()?;
                let tools = ctx.tools().clone();
                Some(FanOutTask::new(position, async move {
                    tools.quickcheck(bam).await
                }))
            })
            .collect();

        Ok(Dispatch::FanOut {
            tasks,
            on_result: record_validation,
        })
    }
}

fn record_validation(item: &mut WorkItem, outcome: JobOutcome) {
    item.validation_success = outcome.is_success();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn aligned(id: &str, success: bool) -> WorkItem {
        WorkItem {
            aligned_path: Some(format!("5_realignments/GnT_scRNA/{id}.bam").into()),
            alignment_success: success,
            ..WorkItem::discovered(id, "/seq/1", "1", false)
        }
    }

    #[tokio::test]
    async fn test_one_task_per_aligned_item() {
        let harness = TestHarness::new();
        let mut items =
            WorkCollection::from_items(vec![aligned("a", true), aligned("b", false), aligned("c", true)])
                .unwrap();

        let dispatch = ValidateStage.submit(&harness.context(), &mut items).await.unwrap();

        let Dispatch::FanOut { tasks, .. } = dispatch else {
            panic!("expected fan-out");
        };
        let positions: Vec<_> = tasks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2]);

        let outcomes = futures::future::join_all(tasks.into_iter().map(|t| t.future)).await;
        assert_eq!(outcomes, vec![JobOutcome::Succeeded, JobOutcome::Succeeded]);
        assert_eq!(harness.tools().calls().len(), 2);
    }
}
