//! monopack - deterministic container packaging pipeline for workspace monorepos
//!
//! monopack transforms a monorepo source tree into a pruned, non-root,
//! layer-cache-aware runtime image, and supervises the packaged process with
//! HTTP liveness probing.
//!
//! # Core Concepts
//!
//! - **Pipeline**: five strictly sequential build stages - dependency
//!   resolution, source assembly, build transform, production pruning, and
//!   image assembly. Each stage's output is an explicit artifact consumed by
//!   the next; the first failure aborts the whole build.
//! - **Layers**: the image is an ordered set of content-addressed blobs.
//!   Layers keyed only by manifests precede layers derived from full source,
//!   so unchanged dependency layers are reused across builds.
//! - **Runtime Identity**: an unprivileged user/group owns every file in the
//!   image and runs the packaged process.
//! - **Supervision**: one long-lived process, probed at `/api/v1/status` on a
//!   fixed cadence with a startup grace period and a consecutive-failure
//!   threshold. The supervisor reports health; the surrounding orchestrator
//!   owns restarts.
//!
//! # Example Usage
//!
//! ```ignore
//! use monopack::config::BuildConfig;
//! use monopack::pipeline::{BuildContext, PipelineOrchestrator};
//! use std::path::PathBuf;
//!
//! async fn build(repo: PathBuf, out: PathBuf) -> anyhow::Result<()> {
//!     let config = BuildConfig::from_env()?;
//!     let work = out.join("work");
//!     let context = BuildContext::with_defaults(config, repo, work, out);
//!     let image = PipelineOrchestrator::new().execute(&context).await?;
//!     println!("image at {}", image.path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: stage trait, context, orchestrator, and the five stages
//! - [`image`]: layers, blob writer, runtime identity and contract
//! - [`supervise`]: health state machine, HTTP prober, process supervisor
//! - [`manifest`]: package manifests and workspace discovery

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod image;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod supervise;

// Re-export key types for convenient access
pub use config::{BuildConfig, ConfigError};
pub use error::{PipelineError, SuperviseError};
pub use image::{Layer, LayerKind, RuntimeContract, RuntimeIdentity};
pub use manifest::{Manifest, Workspace, WorkspaceSet};
pub use output::{BuildReport, ImagePlan};
pub use pipeline::{BuildContext, PipelineOrchestrator};
pub use supervise::{HealthMonitor, HealthState, ProbeParams, Supervisor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_monopack() {
        assert_eq!(NAME, "monopack");
    }
}
