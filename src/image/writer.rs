//! Image blob and manifest writing
//!
//! Layers are packed as gzipped tar blobs, content-addressed under `blobs/`.
//! Entry metadata is normalized (fixed mtime, identity ownership, mode from
//! the executable bit alone) so identical inputs produce identical blobs and
//! unchanged layers are reused across builds.

use super::identity::RuntimeIdentity;
use super::layer::{digest_bytes, validate_order, Layer, LayerKind, LayerSpec};
use super::runtime::RuntimeContract;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MANIFEST_MEDIA_TYPE: &str = "application/vnd.monopack.image.manifest.v1+json";
const MANIFEST_FILENAME: &str = "manifest.json";
const CONFIG_FILENAME: &str = "config.json";
const BLOBS_DIR: &str = "blobs";

/// Ordered layer index of a built image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: i32,
    pub media_type: String,
    pub build_id: String,
    pub created: DateTime<Utc>,
    pub layers: Vec<Layer>,
}

impl ImageManifest {
    pub fn read(image_dir: &Path) -> Result<Self> {
        let path = image_dir.join(MANIFEST_FILENAME);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }
}

/// Writes layers, the manifest, and the runtime config into an image directory
pub struct ImageWriter {
    output_dir: PathBuf,
    identity: RuntimeIdentity,
}

impl ImageWriter {
    pub fn new(output_dir: impl Into<PathBuf>, identity: RuntimeIdentity) -> Self {
        Self {
            output_dir: output_dir.into(),
            identity,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pack one layer spec into a content-addressed blob.
    ///
    /// Returns the layer descriptor; `reused` is set when a blob with the
    /// same digest already exists from a previous build.
    pub fn write_layer(&self, spec: &LayerSpec) -> Result<Layer> {
        let bytes = self.pack(spec)?;
        let digest = digest_bytes(&bytes);
        let blob_path = self.blob_path(&digest);

        let reused = blob_path.exists();
        if !reused {
            fs::create_dir_all(self.output_dir.join(BLOBS_DIR))?;
            fs::write(&blob_path, &bytes)
                .with_context(|| format!("Failed to write blob {}", blob_path.display()))?;
        }
        debug!(kind = spec.kind.name(), digest = %digest, reused, "Layer packed");

        Ok(Layer {
            kind: spec.kind,
            digest,
            size: bytes.len() as u64,
            reused,
        })
    }

    /// Write the ordered layer index, under an exclusive file lock.
    ///
    /// The cache-locality ordering invariant is enforced here as the last
    /// gate before the manifest becomes visible.
    pub fn write_manifest(&self, build_id: &str, layers: &[Layer]) -> Result<()> {
        let kinds: Vec<LayerKind> = layers.iter().map(|l| l.kind).collect();
        validate_order(&kinds)?;

        let manifest = ImageManifest {
            schema_version: 1,
            media_type: MANIFEST_MEDIA_TYPE.to_string(),
            build_id: build_id.to_string(),
            created: Utc::now(),
            layers: layers.to_vec(),
        };

        let path = self.output_dir.join(MANIFEST_FILENAME);
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", path.display()))?;

        let mut file = file;
        file.set_len(0)?;
        let content = serde_json::to_string_pretty(&manifest)?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), layers = layers.len(), "Image manifest written");
        Ok(())
    }

    /// Write the runtime contract document
    pub fn write_config(&self, contract: &RuntimeContract) -> Result<()> {
        contract.validate()?;
        let path = self.output_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(contract)?;
        fs::create_dir_all(&self.output_dir)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.output_dir
            .join(BLOBS_DIR)
            .join(format!("{}.tar.gz", digest.replace(':', "-")))
    }

    /// Serialize a layer spec into normalized gzipped tar bytes
    fn pack(&self, spec: &LayerSpec) -> Result<Vec<u8>> {
        let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (source, dest) in &spec.files {
            collect_files(source, dest, &mut files)?;
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (source, dest) in &files {
            let data = fs::read(source)
                .with_context(|| format!("Failed to read {}", source.display()))?;

            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(entry_mode(source));
            header.set_uid(self.identity.uid as u64);
            header.set_gid(self.identity.gid as u64);
            header.set_username(&self.identity.user)?;
            header.set_groupname(&self.identity.user)?;
            header.set_mtime(0);

            builder
                .append_data(&mut header, dest, data.as_slice())
                .with_context(|| format!("Failed to pack {}", dest.display()))?;
        }

        let encoder = builder.into_inner()?;
        Ok(encoder.finish()?)
    }
}

/// Expand a (source, dest) pair into per-file pairs, walking directories in
/// sorted order so blob contents are deterministic
fn collect_files(source: &Path, dest: &Path, out: &mut Vec<(PathBuf, PathBuf)>) -> Result<()> {
    if source.is_file() {
        out.push((source.to_path_buf(), dest.to_path_buf()));
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(source)
        .with_context(|| format!("Failed to list {}", source.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let child_dest = dest.join(entry.file_name());
        if path.is_dir() {
            collect_files(&path, &child_dest, out)?;
        } else if path.is_file() {
            out.push((path, child_dest));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn entry_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    let executable = fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false);
    if executable {
        0o755
    } else {
        0o644
    }
}

#[cfg(not(unix))]
fn entry_mode(_path: &Path) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn identity() -> RuntimeIdentity {
        RuntimeIdentity::new("node", 1000, 1000).unwrap()
    }

    fn spec_with_file(dir: &Path, name: &str, contents: &str) -> LayerSpec {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        let mut spec = LayerSpec::new(LayerKind::RootManifests);
        spec.add(path, PathBuf::from(name));
        spec
    }

    #[test]
    fn test_layer_blob_is_deterministic() {
        let src = TempDir::new().unwrap();
        let out_a = TempDir::new().unwrap();
        let out_b = TempDir::new().unwrap();
        let spec = spec_with_file(src.path(), "package.json", r#"{"name":"acme"}"#);

        let a = ImageWriter::new(out_a.path(), identity())
            .write_layer(&spec)
            .unwrap();
        let b = ImageWriter::new(out_b.path(), identity())
            .write_layer(&spec)
            .unwrap();
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_unchanged_layer_is_reused() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let spec = spec_with_file(src.path(), "package.json", "{}");
        let writer = ImageWriter::new(out.path(), identity());

        let first = writer.write_layer(&spec).unwrap();
        let second = writer.write_layer(&spec).unwrap();
        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_every_entry_owned_by_identity() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("store/express")).unwrap();
        fs::write(src.path().join("store/express/index.js"), "module.exports").unwrap();
        fs::write(src.path().join("store/express/package.json"), "{}").unwrap();

        let mut spec = LayerSpec::new(LayerKind::Dependencies);
        spec.add(src.path().join("store"), PathBuf::from("node_modules"));
        let writer = ImageWriter::new(out.path(), identity());
        let layer = writer.write_layer(&spec).unwrap();

        let blob = out
            .path()
            .join("blobs")
            .join(format!("{}.tar.gz", layer.digest.replace(':', "-")));
        let mut archive = tar::Archive::new(GzDecoder::new(fs::File::open(blob).unwrap()));
        let mut count = 0;
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            assert_eq!(entry.header().uid().unwrap(), 1000);
            assert_eq!(entry.header().gid().unwrap(), 1000);
            assert_ne!(entry.header().uid().unwrap(), 0);
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_manifest_roundtrip_and_order_gate() {
        let out = TempDir::new().unwrap();
        let writer = ImageWriter::new(out.path(), identity());

        let layers = vec![
            Layer {
                kind: LayerKind::RootManifests,
                digest: digest_bytes(b"a"),
                size: 1,
                reused: false,
            },
            Layer {
                kind: LayerKind::Artifacts,
                digest: digest_bytes(b"b"),
                size: 1,
                reused: false,
            },
        ];
        writer.write_manifest("build-1", &layers).unwrap();

        let manifest = ImageManifest::read(out.path()).unwrap();
        assert_eq!(manifest.schema_version, 1);
        assert_eq!(manifest.build_id, "build-1");
        assert_eq!(manifest.layers.len(), 2);

        // Manifest-derived layer after a source-derived one must be refused
        let bad = vec![layers[1].clone(), layers[0].clone()];
        assert!(writer.write_manifest("build-2", &bad).is_err());
    }

    #[test]
    fn test_config_written_and_parseable() {
        let out = TempDir::new().unwrap();
        let writer = ImageWriter::new(out.path(), identity());
        let contract = RuntimeContract::new(
            &crate::config::BuildConfig::default(),
            identity(),
            &crate::supervise::ProbeParams::default(),
        );

        writer.write_config(&contract).unwrap();
        let content = fs::read_to_string(out.path().join("config.json")).unwrap();
        let parsed: RuntimeContract = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.port.default, 3000);
        assert_eq!(parsed.healthcheck.path, "/api/v1/status");
    }
}
