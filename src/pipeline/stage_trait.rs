//! Build stage trait and the forward-only pipeline state

use super::context::BuildContext;
use super::stages::assemble::AssembledSource;
use super::stages::image::BuiltImage;
use super::stages::prune::PrunedStore;
use super::stages::resolve::DependencyStore;
use super::stages::transform::WorkspaceArtifacts;
use crate::error::PipelineError;
use crate::manifest::WorkspaceSet;
use anyhow::Result;
use async_trait::async_trait;

/// Artifacts produced so far, one slot per stage, each written exactly once.
///
/// Data flows strictly forward: a stage reads the slots of its predecessors
/// and fills its own. Reading an unfilled slot is a precondition violation,
/// which the orchestrator's fixed ordering makes unreachable in practice.
#[derive(Default)]
pub struct PipelineState {
    pub workspaces: Option<WorkspaceSet>,
    pub store: Option<DependencyStore>,
    pub assembled: Option<AssembledSource>,
    pub artifacts: Option<WorkspaceArtifacts>,
    pub pruned: Option<PrunedStore>,
    pub image: Option<BuiltImage>,
}

impl PipelineState {
    pub fn workspaces(&self) -> Result<&WorkspaceSet> {
        self.workspaces
            .as_ref()
            .ok_or_else(|| PipelineError::Precondition("workspace discovery has not run").into())
    }

    pub fn store(&self) -> Result<&DependencyStore> {
        self.store
            .as_ref()
            .ok_or_else(|| PipelineError::Precondition("dependency resolution has not run").into())
    }

    pub fn assembled(&self) -> Result<&AssembledSource> {
        self.assembled
            .as_ref()
            .ok_or_else(|| PipelineError::Precondition("source assembly has not run").into())
    }

    pub fn artifacts(&self) -> Result<&WorkspaceArtifacts> {
        self.artifacts
            .as_ref()
            .ok_or_else(|| PipelineError::Precondition("build transform has not run").into())
    }

    pub fn pruned(&self) -> Result<&PrunedStore> {
        self.pruned
            .as_ref()
            .ok_or_else(|| PipelineError::Precondition("production prune has not run").into())
    }
}

/// One sequential build stage
#[async_trait]
pub trait BuildStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfilled_slots_are_precondition_errors() {
        let state = PipelineState::default();
        let err = state.store().unwrap_err();
        let pipeline_err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(pipeline_err, PipelineError::Precondition(_)));
    }
}
