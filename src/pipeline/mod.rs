//! The build pipeline: manifests in, runtime image out

mod context;
mod orchestrator;
mod stage_trait;
pub mod stages;

pub use context::BuildContext;
pub use orchestrator::PipelineOrchestrator;
pub use stage_trait::{BuildStage, PipelineState};
