//! Stage 2: fetch and parse per-file metadata.

use super::{Dispatch, Stage};
use crate::core::{StageId, WorkCollection};
use crate::errors::Result;
use crate::external::attribute_value;
use crate::pipeline::StageContext;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Stores each downloaded file's metadata next to it and reads the category
/// and label out of it.
///
/// Runs the collection-wide label check before returning, so a duplicate
/// label stops the run before this stage's checkpoint exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataStage;

#[async_trait]
impl Stage for MetadataStage {
    fn id(&self) -> StageId {
        StageId::Metadata
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let attributes = &ctx.config().metadata;
        let download_dir = StageContext::stage_dir(StageId::Download);

        for position in items.positions_where(|item| item.ready_for_metadata()) {
            let Some(item) = items.get_mut_at(position) else {
                continue;
            };
            let text = ctx.archive().fetch_metadata(&item.source_location).await?;

            let local = item
                .local_path
                .clone()
                .unwrap_or_else(|| download_dir.join(&item.id));
            let mut metadata_path = local.into_os_string();
            metadata_path.push(".imeta");
            let metadata_path = PathBuf::from(metadata_path);
            tokio::fs::write(ctx.resolve(&metadata_path), &text).await?;
            item.metadata_path = Some(metadata_path);
            item.metadata_fetched = true;

            item.category = attribute_value(&text, &attributes.category_attribute);
            item.label = attribute_value(&text, &attributes.label_attribute);
            item.metadata_parsed = item.label.is_some();
            if !item.metadata_parsed {
                warn!(
                    id = %item.id,
                    attribute = %attributes.label_attribute,
                    "No label found in metadata"
                );
            }
        }

        info!(
            parsed = items.count_where(|item| item.metadata_parsed),
            "Checking labels are unique within each category"
        );
        items.check_labels()?;
        Ok(Dispatch::Complete)
    }
}
