//! Plan and report output structures

mod plan;
mod report;

pub use plan::{BuildPlan, ImagePlan, LayerPlan, PlanMetadata};
pub use report::BuildReport;
