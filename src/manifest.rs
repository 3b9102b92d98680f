//! Package manifests and workspace discovery
//!
//! A manifest is the package-json document a workspace declares itself with:
//! name, scripts, runtime dependencies, development dependencies, and (for the
//! root) the workspace member list. Discovery validates the invariant that
//! every member named by the root manifest has a manifest at its expected
//! path before any pipeline stage runs.

use crate::error::PipelineError;
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Manifest file name inside every workspace
pub const MANIFEST_FILENAME: &str = "package.json";

/// Lockfile pinning the resolved dependency tree
pub const LOCKFILE_FILENAME: &str = "package-lock.json";

/// A parsed package manifest
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub scripts: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub workspaces: Vec<String>,
}

impl Manifest {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse manifest")
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// True if this manifest declares workspace members
    pub fn is_workspace_root(&self) -> bool {
        !self.workspaces.is_empty()
    }
}

/// One workspace member: its relative path and parsed manifest
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Package name from the member manifest
    pub name: String,
    /// Path relative to the repository root
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// The validated root manifest plus all workspace members
#[derive(Debug, Clone)]
pub struct WorkspaceSet {
    pub root_dir: PathBuf,
    pub root: Manifest,
    pub workspaces: Vec<Workspace>,
}

impl WorkspaceSet {
    /// Discover and validate the workspace layout under `root_dir`.
    ///
    /// Fatal if the root manifest or lockfile is missing, if the root
    /// declares no members, or if any member lacks a manifest at its
    /// declared path. Member entries are literal paths; glob patterns are
    /// rejected so the "stable, predictable path" invariant stays checkable.
    pub fn discover(fs: &dyn FileSystem, root_dir: &Path) -> Result<Self> {
        let root_manifest_path = root_dir.join(MANIFEST_FILENAME);
        if !fs.is_file(&root_manifest_path) {
            return Err(PipelineError::Manifest(format!(
                "no root manifest at {}",
                root_manifest_path.display()
            ))
            .into());
        }
        let root = Manifest::load(fs, &root_manifest_path)?;

        if !root.is_workspace_root() {
            return Err(PipelineError::Manifest(format!(
                "{} declares no workspaces",
                root_manifest_path.display()
            ))
            .into());
        }

        let lockfile_path = root_dir.join(LOCKFILE_FILENAME);
        if !fs.is_file(&lockfile_path) {
            return Err(PipelineError::Manifest(format!(
                "no lockfile at {}; resolution must be lockfile-pinned",
                lockfile_path.display()
            ))
            .into());
        }

        let mut workspaces = Vec::with_capacity(root.workspaces.len());
        for member in &root.workspaces {
            if member.contains('*') {
                return Err(PipelineError::Manifest(format!(
                    "workspace pattern '{}' is not a literal path",
                    member
                ))
                .into());
            }
            let member_path = PathBuf::from(member);
            let manifest_path = root_dir.join(&member_path).join(MANIFEST_FILENAME);
            if !fs.is_file(&manifest_path) {
                return Err(PipelineError::missing_workspace(&root_manifest_path, member).into());
            }
            let manifest = Manifest::load(fs, &manifest_path)?;
            let name = if manifest.name.is_empty() {
                member.clone()
            } else {
                manifest.name.clone()
            };
            workspaces.push(Workspace {
                name,
                path: member_path,
                manifest,
            });
        }

        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            root,
            workspaces,
        })
    }

    /// Absolute path of the root manifest
    pub fn root_manifest_path(&self) -> PathBuf {
        self.root_dir.join(MANIFEST_FILENAME)
    }

    /// Absolute path of the root lockfile
    pub fn lockfile_path(&self) -> PathBuf {
        self.root_dir.join(LOCKFILE_FILENAME)
    }

    /// Relative paths of every manifest plus the lockfile, root first.
    ///
    /// This is the exact input set of the dependency resolver; its byte
    /// content determines the resolver's cache key.
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(MANIFEST_FILENAME),
            PathBuf::from(LOCKFILE_FILENAME),
        ];
        for ws in &self.workspaces {
            paths.push(ws.path.join(MANIFEST_FILENAME));
        }
        paths
    }

    /// Direct production dependencies declared by the root and every member.
    ///
    /// devDependencies never contribute, per the pruning contract.
    pub fn production_dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = self.root.dependencies.keys().cloned().collect();
        for ws in &self.workspaces {
            deps.extend(ws.manifest.dependencies.keys().cloned());
        }
        deps.sort();
        deps.dedup();
        deps
    }
}
