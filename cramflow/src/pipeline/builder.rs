//! Pipeline builder with validation, and the controller that runs it.

use super::{StageContext, StageDriver};
use crate::core::WorkCollection;
use crate::errors::{PipelineValidationError, Result};
use crate::stages::{standard_stages, Stage};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Builder for creating validated pipelines.
#[derive(Debug, Default, Clone)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends the nine standard stages.
    #[must_use]
    pub fn standard(mut self) -> Self {
        self.stages.extend(standard_stages());
        self
    }

    /// Validates the stage order and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if no stages were added, or if the stages are not
    /// registered with contiguous indices starting at 0.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages"));
        }

        for (expected, stage) in self.stages.iter().enumerate() {
            let id = stage.id();
            if id.index() != expected {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' has index {} but is registered at position {expected}",
                    id.name(),
                    id.index()
                ))
                .with_stages(self.stages.iter().map(|s| s.id().name().to_string()).collect()));
            }
        }

        Ok(Pipeline {
            stages: self.stages,
        })
    }
}

/// An ordered, validated sequence of stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// The nine standard stages in order.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: standard_stages(),
        }
    }

    /// The stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Runs every stage in order over a fresh collection.
    ///
    /// Stages with a checkpoint are resumed rather than executed, so calling
    /// this again after a failure continues from the first stage without one.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error. Checkpoints written before it remain.
    pub async fn run(&self, ctx: &StageContext, driver: &StageDriver) -> Result<WorkCollection> {
        let invocation = Uuid::new_v4();
        let span = info_span!(
            "pipeline",
            invocation = %invocation,
            run = ctx.run_id(),
            lane = ctx.lane()
        );
        self.run_stages(ctx, driver).instrument(span).await
    }

    async fn run_stages(&self, ctx: &StageContext, driver: &StageDriver) -> Result<WorkCollection> {
        info!(stages = self.stages.len(), work_dir = %ctx.work_dir().display(), "Pipeline starting");
        let mut items = WorkCollection::new();

        for stage in &self.stages {
            let id = stage.id();
            let span = info_span!("stage", index = id.index(), name = id.name());
            driver
                .run(stage.as_ref(), ctx, &mut items)
                .instrument(span)
                .await?;
        }

        info!(items = items.len(), "Pipeline complete");
        ctx.events()
            .emit(
                "pipeline.completed",
                Some(serde_json::json!({
                    "run": ctx.run_id(),
                    "lane": ctx.lane(),
                    "items": items.len(),
                })),
            )
            .await;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{DiscoverStage, DownloadStage, MetadataStage};

    #[test]
    fn test_standard_builder_is_valid() {
        let pipeline = PipelineBuilder::new().standard().build().unwrap();
        let names: Vec<_> = pipeline.stages().iter().map(|s| s.id().name()).collect();
        assert_eq!(names.first(), Some(&"discover"));
        assert_eq!(names.last(), Some(&"aggregate"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_empty_pipeline_is_rejected() {
        let err = PipelineBuilder::new().build().unwrap_err();
        assert!(err.message.contains("no stages"));
    }

    #[test]
    fn test_gap_in_stage_indices_is_rejected() {
        let err = PipelineBuilder::new()
            .stage(Arc::new(DiscoverStage))
            .stage(Arc::new(MetadataStage))
            .build()
            .unwrap_err();

        assert!(err.message.contains("metadata"));
        assert_eq!(err.stages, vec!["discover", "metadata"]);
    }

    #[test]
    fn test_prefix_of_standard_stages_is_valid() {
        let pipeline = PipelineBuilder::new()
            .stage(Arc::new(DiscoverStage))
            .stage(Arc::new(DownloadStage))
            .build()
            .unwrap();
        assert_eq!(pipeline.stages().len(), 2);
    }
}
