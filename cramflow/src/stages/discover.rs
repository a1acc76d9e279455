//! Stage 0: find the run's files in the archive.

use super::{Dispatch, Stage};
use crate::core::{StageId, WorkCollection, WorkItem};
use crate::errors::{DataIntegrityError, Result};
use crate::pipeline::StageContext;
use async_trait::async_trait;
use tracing::info;

/// Queries the archive for the run and lane and confirms each file exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoverStage;

#[async_trait]
impl Stage for DiscoverStage {
    fn id(&self) -> StageId {
        StageId::Discover
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        info!(run = ctx.run_id(), lane = ctx.lane(), "Querying archive");
        let objects = ctx.archive().query(ctx.run_id(), ctx.lane()).await?;
        if objects.is_empty() {
            return Err(DataIntegrityError::EmptyDiscovery {
                run: ctx.run_id().to_string(),
                lane: ctx.lane().to_string(),
            }
            .into());
        }

        let marker = &ctx.config().archive.control_marker;
        let mut discovered = WorkCollection::new();
        for object in objects {
            let lane = object.lane()?;
            let is_control = object.is_control(marker);
            discovered.push(WorkItem::discovered(
                object.name,
                object.collection,
                lane,
                is_control,
            ))?;
        }

        info!(found = discovered.len(), "Verifying archive objects exist");
        for position in 0..discovered.len() {
            let Some(item) = discovered.get_mut_at(position) else {
                continue;
            };
            item.exists_remote = ctx.archive().exists(&item.source_location).await?;
        }

        *items = discovered;
        Ok(Dispatch::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedArchive, TestHarness};

    #[tokio::test]
    async fn test_discovers_items_and_controls() {
        let archive = ScriptedArchive::new()
            .with_object("/seq/35000", "35000_2#1.cram")
            .with_object("/seq/35000", "35000_2#888_phix.cram");
        let harness = TestHarness::new().with_archive(archive.clone());
        let mut items = WorkCollection::new();

        let dispatch = DiscoverStage.submit(&harness.context(), &mut items).await.unwrap();

        assert!(matches!(dispatch, Dispatch::Complete));
        assert_eq!(items.len(), 2);
        let first = items.get("35000_2#1.cram").unwrap();
        assert_eq!(first.lane, "2");
        assert_eq!(first.source_location, "/seq/35000/35000_2#1.cram");
        assert!(first.exists_remote);
        assert!(!first.is_control);
        assert!(items.get("35000_2#888_phix.cram").unwrap().is_control);
        assert_eq!(archive.calls_starting_with("exists").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_is_fatal() {
        let harness = TestHarness::new().with_archive(ScriptedArchive::new());
        let mut items = WorkCollection::new();

        let err = DiscoverStage
            .submit(&harness.context(), &mut items)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 6);
    }

    #[tokio::test]
    async fn test_missing_object_is_recorded() {
        let archive = ScriptedArchive::new()
            .with_object("/seq/1", "1_1#1.cram")
            .missing("/seq/1/1_1#1.cram");
        let harness = TestHarness::new().with_archive(archive);
        let mut items = WorkCollection::new();

        DiscoverStage.submit(&harness.context(), &mut items).await.unwrap();

        let item = items.get("1_1#1.cram").unwrap();
        assert!(!item.exists_remote);
        assert!(!item.ready_for_download());
    }

    #[tokio::test]
    async fn test_failed_existence_check_is_fatal() {
        let archive = ScriptedArchive::new()
            .with_object("/seq/1", "1_1#1.cram")
            .unreachable("/seq/1/1_1#1.cram");
        let harness = TestHarness::new().with_archive(archive);
        let mut items = WorkCollection::new();

        let err = DiscoverStage
            .submit(&harness.context(), &mut items)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
