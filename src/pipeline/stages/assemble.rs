//! Source assembler stage
//!
//! Overlays each workspace's full source tree and the shared build
//! configuration onto the resolver's working environment. The dependency
//! store is never written to; workspace trees land at the same relative
//! paths the build transformer expects. Ignore files are honored so editor
//! droppings and local build residue stay out of the working environment.

use crate::error::PipelineError;
use crate::pipeline::context::BuildContext;
use crate::pipeline::stage_trait::{BuildStage, PipelineState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::resolve::STORE_DIR;

/// The working environment after source overlay
#[derive(Debug, Clone)]
pub struct AssembledSource {
    pub root: PathBuf,
    pub copied_files: usize,
}

pub struct AssembleStage;

#[async_trait]
impl BuildStage for AssembleStage {
    fn name(&self) -> &'static str {
        "assemble"
    }

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()> {
        let workspaces = state.workspaces()?.clone();
        let store_root = state.store()?.root.clone();
        let mut copied = 0;

        for ws in &workspaces.workspaces {
            let src_root = context.repo_path.join(&ws.path);
            let dest_root = context.work_dir.join(&ws.path);
            if dest_root.starts_with(&store_root) {
                return Err(PipelineError::Manifest(format!(
                    "workspace '{}' would overlay the dependency store",
                    ws.name
                ))
                .into());
            }
            copied += copy_tree(context, &src_root, &dest_root)?;
            debug!(workspace = %ws.name, "Source overlaid");
        }

        for name in &context.config.shared_configs {
            let src = context.repo_path.join(name);
            if context.fs.is_file(&src) {
                let content = context.fs.read(&src)?;
                context.fs.write(&context.work_dir.join(name), &content)?;
                copied += 1;
            }
        }

        info!(files = copied, "Sources assembled");
        state.assembled = Some(AssembledSource {
            root: context.work_dir.clone(),
            copied_files: copied,
        });
        Ok(())
    }
}

/// Copy one source tree, honoring ignore files, skipping any nested store
fn copy_tree(context: &BuildContext, src_root: &Path, dest_root: &Path) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkBuilder::new(src_root)
        .hidden(false)
        .filter_entry(|entry| entry.file_name() != STORE_DIR)
        .build();

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", src_root.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src_root)
            .expect("walker yields paths under its root");
        let content = context.fs.read(entry.path())?;
        context.fs.write(&dest_root.join(rel), &content)?;
        copied += 1;
    }
    Ok(copied)
}
