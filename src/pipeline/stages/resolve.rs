//! Dependency resolver stage
//!
//! Validates the workspace layout, stages the manifests (manifests only, so
//! the resolver's inputs are exactly the files that key its cache), and runs
//! the single whole-tree install invocation. Byte-identical manifests produce
//! an identical digest, and a store carrying that digest is reused without
//! re-running the install.

use crate::error::PipelineError;
use crate::manifest::WorkspaceSet;
use crate::pipeline::context::BuildContext;
use crate::pipeline::stage_trait::{BuildStage, PipelineState};
use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info};

/// Directory the shared dependency store lives in
pub const STORE_DIR: &str = "node_modules";

/// Marker recording the digest the current store was resolved from
const DIGEST_MARKER: &str = ".monopack-deps.digest";

/// The shared, lockfile-pinned dependency store
#[derive(Debug, Clone)]
pub struct DependencyStore {
    /// Store directory inside the working environment
    pub root: PathBuf,
    /// Digest over every manifest and the lockfile, `sha256:<hex>`
    pub digest: String,
    /// True when an existing store with the same digest was reused
    pub reused: bool,
}

pub struct ResolveStage;

#[async_trait]
impl BuildStage for ResolveStage {
    fn name(&self) -> &'static str {
        "resolve"
    }

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()> {
        let workspaces = WorkspaceSet::discover(context.fs.as_ref(), &context.repo_path)?;
        info!(
            workspaces = workspaces.workspaces.len(),
            root = %workspaces.root.name,
            "Workspace layout validated"
        );

        let digest = manifest_digest(context, &workspaces)?;
        stage_manifests(context, &workspaces)?;

        let store_root = context.work_dir.join(STORE_DIR);
        let marker = context.work_dir.join(DIGEST_MARKER);

        let reused = context.fs.is_dir(&store_root)
            && context
                .fs
                .read_to_string(&marker)
                .map(|recorded| recorded == digest)
                .unwrap_or(false);

        if reused {
            info!(digest = %digest, "Dependency store reused, manifests unchanged");
        } else {
            let output = context
                .runner
                .run(&context.config.install_command, &context.work_dir, &[])
                .await?;
            if !output.success() {
                return Err(PipelineError::Resolve(format!(
                    "'{}' exited with status {}: {}",
                    context.config.install_command,
                    output.status,
                    output.stderr.trim()
                ))
                .into());
            }
            context.fs.write(&marker, digest.as_bytes())?;
            debug!(digest = %digest, "Dependency store resolved");
        }

        state.workspaces = Some(workspaces);
        state.store = Some(DependencyStore {
            root: store_root,
            digest,
            reused,
        });
        Ok(())
    }
}

/// Digest over the byte content of every manifest plus the lockfile.
///
/// Paths participate so moving a manifest changes the key even when its
/// content does not.
fn manifest_digest(context: &BuildContext, workspaces: &WorkspaceSet) -> Result<String> {
    let mut hasher = Sha256::new();
    for rel in workspaces.manifest_paths() {
        let content = context.fs.read(&context.repo_path.join(&rel))?;
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(&content);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Copy manifests and the lockfile into the working environment at their
/// stable relative paths
fn stage_manifests(context: &BuildContext, workspaces: &WorkspaceSet) -> Result<()> {
    for rel in workspaces.manifest_paths() {
        let content = context.fs.read(&context.repo_path.join(&rel))?;
        context.fs.write(&context.work_dir.join(&rel), &content)?;
    }
    Ok(())
}
