//! Build result reporting

use crate::image::Layer;
use crate::pipeline::stages::image::BuiltImage;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

/// Summary of a completed build, printable in every output format
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build_id: String,
    pub image_path: String,
    pub layers: Vec<Layer>,
}

impl From<&BuiltImage> for BuildReport {
    fn from(image: &BuiltImage) -> Self {
        Self {
            build_id: image.build_id.clone(),
            image_path: image.path.display().to_string(),
            layers: image.layers.clone(),
        }
    }
}

impl BuildReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize report to YAML")
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image assembled at {}", self.image_path)?;
        writeln!(f, "Build id: {}", self.build_id)?;
        writeln!(f, "Layers:")?;
        for layer in &self.layers {
            writeln!(
                f,
                "  {:<20} {}  {:>8} bytes{}",
                layer.kind.name(),
                layer.digest,
                layer.size,
                if layer.reused { "  (reused)" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::LayerKind;
    use std::path::PathBuf;

    fn report() -> BuildReport {
        BuildReport::from(&BuiltImage {
            path: PathBuf::from("/out/image"),
            build_id: "b-1".to_string(),
            layers: vec![Layer {
                kind: LayerKind::RootManifests,
                digest: "sha256:deadbeef".to_string(),
                size: 128,
                reused: true,
            }],
        })
    }

    #[test]
    fn test_display_lists_layers() {
        let rendered = report().to_string();
        assert!(rendered.contains("/out/image"));
        assert!(rendered.contains("root-manifests"));
        assert!(rendered.contains("(reused)"));
    }

    #[test]
    fn test_json_serializes_kinds_kebab_case() {
        let json = report().to_json().unwrap();
        assert!(json.contains("\"root-manifests\""));
    }
}
