//! Runtime image layers
//!
//! The image is an ordered sequence of content-addressed layers. Layers whose
//! inputs are manifests alone sit before layers derived from full source, so
//! a rebuild with unchanged manifests reuses the early blobs. The pruned
//! dependency store is keyed by the resolver digest and sits last in the copy
//! order.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// What a layer's contents are derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    /// Root manifest, lockfile, license
    RootManifests,
    /// Per-workspace manifests
    WorkspaceManifests,
    /// Compiled workspace artifacts
    Artifacts,
    /// Static resources
    StaticResources,
    /// Pruned dependency store
    Dependencies,
}

impl LayerKind {
    /// Derived from manifests/lockfiles only
    pub fn is_manifest_only(self) -> bool {
        matches!(self, LayerKind::RootManifests | LayerKind::WorkspaceManifests)
    }

    /// Derived from the full source tree
    pub fn is_source_derived(self) -> bool {
        matches!(self, LayerKind::Artifacts | LayerKind::StaticResources)
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::RootManifests => "root-manifests",
            LayerKind::WorkspaceManifests => "workspace-manifests",
            LayerKind::Artifacts => "artifacts",
            LayerKind::StaticResources => "static-resources",
            LayerKind::Dependencies => "dependencies",
        }
    }
}

/// Planned contents of one layer: (source path, path inside the image)
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub kind: LayerKind,
    pub files: Vec<(PathBuf, PathBuf)>,
}

impl LayerSpec {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
        }
    }

    pub fn add(&mut self, source: PathBuf, dest: PathBuf) {
        self.files.push((source, dest));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A written (or reused) layer blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub kind: LayerKind,
    /// Content digest, `sha256:<hex>`, doubling as the cache key
    pub digest: String,
    /// Compressed blob size in bytes
    pub size: u64,
    /// True when the blob already existed from a previous build
    #[serde(default)]
    pub reused: bool,
}

/// Enforce the cache-locality ordering invariant over a layer sequence:
/// every manifest-only layer must precede every source-derived layer.
pub fn validate_order(kinds: &[LayerKind]) -> Result<()> {
    let first_source = kinds.iter().position(|k| k.is_source_derived());
    let last_manifest = kinds.iter().rposition(|k| k.is_manifest_only());

    if let (Some(source), Some(manifest)) = (first_source, last_manifest) {
        if manifest > source {
            bail!(
                "layer order violates cache locality: {} after {}",
                kinds[manifest].name(),
                kinds[source].name()
            );
        }
    }
    Ok(())
}

/// Content digest in the `sha256:<hex>` form used throughout the image
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_order_is_valid() {
        let kinds = [
            LayerKind::RootManifests,
            LayerKind::WorkspaceManifests,
            LayerKind::Artifacts,
            LayerKind::StaticResources,
            LayerKind::Dependencies,
        ];
        assert!(validate_order(&kinds).is_ok());
    }

    #[test]
    fn test_manifest_after_source_is_rejected() {
        let kinds = [
            LayerKind::RootManifests,
            LayerKind::Artifacts,
            LayerKind::WorkspaceManifests,
        ];
        let err = validate_order(&kinds).unwrap_err();
        assert!(err.to_string().contains("cache locality"));
    }

    #[test]
    fn test_dependencies_layer_is_unconstrained() {
        // The pruned store is keyed by the resolver digest, not position
        let kinds = [
            LayerKind::Dependencies,
            LayerKind::RootManifests,
            LayerKind::Artifacts,
        ];
        assert!(validate_order(&kinds).is_ok());
    }

    #[test]
    fn test_digest_is_stable() {
        let a = digest_bytes(b"layer contents");
        let b = digest_bytes(b"layer contents");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_digest_differs_on_content() {
        assert_ne!(digest_bytes(b"a"), digest_bytes(b"b"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(LayerKind::Dependencies.name(), "dependencies");
        assert!(LayerKind::RootManifests.is_manifest_only());
        assert!(LayerKind::Artifacts.is_source_derived());
        assert!(!LayerKind::Dependencies.is_manifest_only());
        assert!(!LayerKind::Dependencies.is_source_derived());
    }
}
