//! Stage 4: lay extracted reads out by category.

use super::{Dispatch, Stage};
use crate::core::{StageId, WorkCollection};
use crate::errors::{DataIntegrityError, Result};
use crate::pipeline::StageContext;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Links each item's read files into `4_split_by_category/<category>/`
/// under the item's label.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStage;

/// Creates a relative symlink at `link` pointing to `target`.
///
/// An existing link to the same target is left alone, so a rerun of this
/// stage is harmless. One pointing elsewhere means two items collided on the
/// same category directory and label.
async fn link_relative(ctx: &StageContext, target: &Path, link: &Path) -> Result<()> {
    let relative_target = Path::new("../..").join(target);
    let absolute = ctx.resolve(link);
    match tokio::fs::symlink(&relative_target, &absolute).await {
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = tokio::fs::read_link(&absolute).await?;
            if existing != relative_target {
                return Err(DataIntegrityError::LinkConflict {
                    link: link.display().to_string(),
                    existing: existing.display().to_string(),
                    expected: relative_target.display().to_string(),
                }
                .into());
            }
            debug!(link = %link.display(), "Link already exists");
            Ok(())
        }
        other => Ok(other?),
    }
}

#[async_trait]
impl Stage for LinkStage {
    fn id(&self) -> StageId {
        StageId::Link
    }

    async fn submit(&self, ctx: &StageContext, items: &mut WorkCollection) -> Result<Dispatch> {
        let dir = StageContext::stage_dir(self.id());
        let mut linked = 0;

        for position in items.positions_where(|item| item.ready_for_linking()) {
            let Some(item) = items.get_mut_at(position) else {
                continue;
            };
            let (Some(category_dir), Some(label), Some(read_1), Some(read_2)) = (
                item.category_dir(),
                item.label.clone(),
                item.extracted_path_1.clone(),
                item.extracted_path_2.clone(),
            ) else {
                continue;
            };

            let category_dir = dir.join(category_dir);
            tokio::fs::create_dir_all(ctx.resolve(&category_dir)).await?;

            let link_1: PathBuf = category_dir.join(format!("{label}.1.fq.gz"));
            let link_2: PathBuf = category_dir.join(format!("{label}.2.fq.gz"));
            link_relative(ctx, &read_1, &link_1).await?;
            link_relative(ctx, &read_2, &link_2).await?;

            item.linked_path_1 = Some(link_1);
            item.linked_path_2 = Some(link_2);
            linked += 1;
        }

        info!(linked, "Reads linked by category");
        Ok(Dispatch::Complete)
    }
}
