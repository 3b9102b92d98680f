//! Sequential pipeline orchestration
//!
//! Stages run strictly in order; each stage's precondition is its
//! predecessor's completed artifact. The first failure aborts the whole
//! build, with no retries and nothing promoted past the failed stage.

use super::context::BuildContext;
use super::stage_trait::{BuildStage, PipelineState};
use super::stages::{
    assemble::AssembleStage, image::{BuiltImage, ImageStage}, prune::PruneStage,
    resolve::ResolveStage, transform::TransformStage,
};
use crate::error::PipelineError;
use crate::progress::ProgressEvent;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info};

pub struct PipelineOrchestrator;

impl PipelineOrchestrator {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, context: &BuildContext) -> Result<BuiltImage> {
        let start = Instant::now();
        info!(repo = %context.repo_path.display(), "Starting build pipeline");
        context.progress.on_progress(&ProgressEvent::Started {
            repo_path: context.repo_path.display().to_string(),
        });

        let stages: Vec<Box<dyn BuildStage>> = vec![
            Box::new(ResolveStage),
            Box::new(AssembleStage),
            Box::new(TransformStage),
            Box::new(PruneStage),
            Box::new(ImageStage),
        ];

        let mut state = PipelineState::default();
        for stage in stages {
            let name = stage.name();
            context.progress.on_progress(&ProgressEvent::StageStarted {
                stage: name.to_string(),
            });

            let stage_start = Instant::now();
            let result = stage
                .execute(context, &mut state)
                .await
                .with_context(|| format!("Stage '{}' failed", name));

            if let Err(e) = result {
                context.progress.on_progress(&ProgressEvent::Failed {
                    error: format!("{:#}", e),
                });
                return Err(e);
            }

            context.progress.on_progress(&ProgressEvent::StageComplete {
                stage: name.to_string(),
                duration: stage_start.elapsed(),
            });
            debug!(stage = name, "Stage complete");
        }

        let image = state
            .image
            .take()
            .ok_or(PipelineError::Precondition("image stage produced no image"))?;

        context.progress.on_progress(&ProgressEvent::Completed {
            image_path: image.path.display().to_string(),
            total_time: start.elapsed(),
        });
        info!(
            image = %image.path.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pipeline complete"
        );
        Ok(image)
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
