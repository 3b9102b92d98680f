//! Build transformer stage
//!
//! One build invocation over the whole assembled tree. The stage is atomic:
//! a nonzero exit, or any workspace left without its artifact directory,
//! fails the build with no artifact set promoted.

use crate::error::PipelineError;
use crate::pipeline::context::BuildContext;
use crate::pipeline::stage_trait::{BuildStage, PipelineState};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Compiled output directories, one per workspace, never intermixed
#[derive(Debug, Clone)]
pub struct WorkspaceArtifacts {
    /// Workspace name → absolute artifact directory
    pub dirs: BTreeMap<String, PathBuf>,
}

pub struct TransformStage;

#[async_trait]
impl BuildStage for TransformStage {
    fn name(&self) -> &'static str {
        "transform"
    }

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()> {
        let workspaces = state.workspaces()?.clone();
        let assembled = state.assembled()?;

        let output = context
            .runner
            .run(&context.config.build_command, &assembled.root, &[])
            .await?;
        if !output.success() {
            return Err(PipelineError::Compile(format!(
                "'{}' exited with status {}: {}",
                context.config.build_command,
                output.status,
                output.stderr.trim()
            ))
            .into());
        }

        let mut dirs = BTreeMap::new();
        for ws in &workspaces.workspaces {
            let artifact_dir = context
                .work_dir
                .join(&ws.path)
                .join(&context.config.artifact_dir);
            if !context.fs.is_dir(&artifact_dir) {
                return Err(PipelineError::Compile(format!(
                    "workspace '{}' produced no artifacts at {}",
                    ws.name,
                    artifact_dir.display()
                ))
                .into());
            }
            dirs.insert(ws.name.clone(), artifact_dir);
        }

        info!(workspaces = dirs.len(), "Build transform complete");
        state.artifacts = Some(WorkspaceArtifacts { dirs });
        Ok(())
    }
}
