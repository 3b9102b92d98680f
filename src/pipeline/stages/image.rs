//! Image assembler stage
//!
//! Constructs the runtime filesystem from the enumerated inputs alone, in
//! the fixed copy order: root manifests and license first, workspace
//! manifests, compiled artifacts, static resources, then the pruned store.
//! Nothing from the raw assembled working tree is copied. Every layer is
//! owned by the unprivileged runtime identity.

use crate::error::PipelineError;
use crate::image::{
    validate_order, Layer, LayerKind, LayerSpec, ImageWriter, RuntimeContract, RuntimeIdentity,
};
use crate::manifest::{LOCKFILE_FILENAME, MANIFEST_FILENAME};
use crate::pipeline::context::BuildContext;
use crate::pipeline::stage_trait::{BuildStage, PipelineState};
use crate::progress::ProgressEvent;
use crate::supervise::ProbeParams;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Store path inside the runtime image
const IMAGE_STORE_DIR: &str = "node_modules";

/// The assembled runtime image
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub path: PathBuf,
    pub layers: Vec<Layer>,
    pub build_id: String,
}

pub struct ImageStage;

#[async_trait]
impl BuildStage for ImageStage {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()> {
        let workspaces = state.workspaces()?.clone();
        let artifacts = state.artifacts()?.clone();
        let pruned = state.pruned()?.clone();
        let config = &context.config;

        let identity = RuntimeIdentity::new(&config.image_user, config.image_uid, config.image_gid)
            .map_err(|e| PipelineError::Image(e.to_string()))?;

        let mut specs = Vec::new();

        let mut root_spec = LayerSpec::new(LayerKind::RootManifests);
        root_spec.add(
            context.repo_path.join(MANIFEST_FILENAME),
            PathBuf::from(MANIFEST_FILENAME),
        );
        root_spec.add(
            context.repo_path.join(LOCKFILE_FILENAME),
            PathBuf::from(LOCKFILE_FILENAME),
        );
        let license = context.repo_path.join(&config.license_file);
        if context.fs.is_file(&license) {
            root_spec.add(license, PathBuf::from(&config.license_file));
        } else {
            warn!(file = %config.license_file, "No license file, omitting from image");
        }
        specs.push(root_spec);

        let mut ws_spec = LayerSpec::new(LayerKind::WorkspaceManifests);
        for ws in &workspaces.workspaces {
            ws_spec.add(
                context.repo_path.join(&ws.path).join(MANIFEST_FILENAME),
                ws.path.join(MANIFEST_FILENAME),
            );
        }
        specs.push(ws_spec);

        let mut artifact_spec = LayerSpec::new(LayerKind::Artifacts);
        for ws in &workspaces.workspaces {
            let dir = artifacts.dirs.get(&ws.name).ok_or_else(|| {
                PipelineError::Image(format!("workspace '{}' has no artifact directory", ws.name))
            })?;
            artifact_spec.add(dir.clone(), ws.path.join(&config.artifact_dir));
        }
        specs.push(artifact_spec);

        let mut static_spec = LayerSpec::new(LayerKind::StaticResources);
        let static_dir = context.repo_path.join(&config.static_dir);
        if context.fs.is_dir(&static_dir) {
            static_spec.add(static_dir, PathBuf::from(&config.static_dir));
        } else {
            warn!(dir = %config.static_dir, "No static resources directory");
        }
        specs.push(static_spec);

        let mut deps_spec = LayerSpec::new(LayerKind::Dependencies);
        deps_spec.add(pruned.root.clone(), PathBuf::from(IMAGE_STORE_DIR));
        specs.push(deps_spec);

        let kinds: Vec<LayerKind> = specs.iter().map(|s| s.kind).collect();
        validate_order(&kinds).map_err(|e| PipelineError::Image(e.to_string()))?;

        let writer = ImageWriter::new(&context.output_dir, identity.clone());
        let mut layers = Vec::new();
        for spec in &specs {
            if spec.is_empty() {
                continue;
            }
            let layer = writer
                .write_layer(spec)
                .map_err(|e| PipelineError::Image(format!("{} layer: {}", spec.kind.name(), e)))?;
            context.progress.on_progress(&ProgressEvent::LayerWritten {
                digest: layer.digest.clone(),
                size: layer.size,
                reused: layer.reused,
            });
            layers.push(layer);
        }

        let contract = RuntimeContract::new(config, identity, &ProbeParams::default());
        writer
            .write_config(&contract)
            .map_err(|e| PipelineError::Image(e.to_string()))?;
        writer
            .write_manifest(&context.build_id, &layers)
            .map_err(|e| PipelineError::Image(e.to_string()))?;

        info!(
            layers = layers.len(),
            image = %context.output_dir.display(),
            "Runtime image assembled"
        );
        state.image = Some(BuiltImage {
            path: context.output_dir.clone(),
            layers,
            build_id: context.build_id.clone(),
        });
        Ok(())
    }
}
