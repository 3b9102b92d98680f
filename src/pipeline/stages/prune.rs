//! Production pruner stage
//!
//! Removes every store entry outside the production closure, in place. The
//! keep-set is driven strictly by manifest declarations: the root's and every
//! workspace's `dependencies`, expanded transitively through the
//! `dependencies` of installed store manifests. devDependencies never
//! contribute. Every removal is logged and reported in the artifact, so a
//! misclassified runtime dependency is visible in build output.

use crate::error::PipelineError;
use crate::fs::FileSystem;
use crate::manifest::{Manifest, WorkspaceSet, MANIFEST_FILENAME};
use crate::pipeline::context::BuildContext;
use crate::pipeline::stage_trait::{BuildStage, PipelineState};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The store after dev-only removal
#[derive(Debug, Clone)]
pub struct PrunedStore {
    pub root: PathBuf,
    pub kept: Vec<String>,
    pub removed: Vec<String>,
    /// Digest of the resolver inputs the store was built from
    pub resolver_digest: String,
}

pub struct PruneStage;

#[async_trait]
impl BuildStage for PruneStage {
    fn name(&self) -> &'static str {
        "prune"
    }

    async fn execute(&self, context: &BuildContext, state: &mut PipelineState) -> Result<()> {
        let workspaces = state.workspaces()?.clone();
        let store = state.store()?.clone();
        // Artifacts must exist before the store is mutated; pruning is the
        // only in-place stage and runs strictly after the build.
        state.artifacts()?;

        let keep = production_closure(context.fs.as_ref(), &workspaces, &store.root)?;

        let mut removed = Vec::new();
        for name in list_store_entries(context.fs.as_ref(), &store.root)? {
            if keep.contains(&name) {
                continue;
            }
            context.fs.remove_dir_all(&store.root.join(&name))?;
            info!(package = %name, "Pruned dev-only dependency");
            removed.push(name);
        }
        remove_empty_scopes(context.fs.as_ref(), &store.root)?;

        info!(kept = keep.len(), removed = removed.len(), "Store pruned");
        state.pruned = Some(PrunedStore {
            root: store.root,
            kept: keep.into_iter().collect(),
            removed,
            resolver_digest: store.digest,
        });
        Ok(())
    }
}

/// Transitive closure of production dependencies, workspace packages
/// included (the store links them for cross-workspace imports).
fn production_closure(
    fs: &dyn FileSystem,
    workspaces: &WorkspaceSet,
    store_root: &Path,
) -> Result<BTreeSet<String>> {
    let workspace_names: BTreeSet<String> = workspaces
        .workspaces
        .iter()
        .map(|ws| ws.name.clone())
        .collect();
    let seeds = workspaces.production_dependencies();

    let mut keep: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = workspace_names.iter().cloned().collect();
    queue.extend(seeds.iter().cloned());

    while let Some(name) = queue.pop_front() {
        if !keep.insert(name.clone()) {
            continue;
        }
        let manifest_path = store_root.join(&name).join(MANIFEST_FILENAME);
        if !fs.is_file(&manifest_path) {
            if workspace_names.contains(&name) {
                // Workspace packages resolve from their own trees; their
                // dependencies are already seeded from the manifests.
                continue;
            }
            return Err(PipelineError::Prune(format!(
                "production dependency '{}' has no store entry at {}",
                name,
                manifest_path.display()
            ))
            .into());
        }
        let manifest = Manifest::load(fs, &manifest_path)
            .map_err(|e| PipelineError::Prune(format!("store entry '{}': {}", name, e)))?;
        for dep in manifest.dependencies.keys() {
            if !keep.contains(dep) {
                queue.push_back(dep.clone());
            }
        }
    }
    debug!(packages = keep.len(), "Production closure computed");
    Ok(keep)
}

/// Package names present in the store, scoped entries flattened to
/// `@scope/name`; dot-entries are store metadata, not packages
fn list_store_entries(fs: &dyn FileSystem, store_root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !fs.is_dir(store_root) {
        return Ok(names);
    }
    for entry in fs.read_dir(store_root)? {
        if !entry.is_dir() || entry.name.starts_with('.') {
            continue;
        }
        if entry.name.starts_with('@') {
            for scoped in fs.read_dir(&entry.path)? {
                if scoped.is_dir() {
                    names.push(format!("{}/{}", entry.name, scoped.name));
                }
            }
        } else {
            names.push(entry.name);
        }
    }
    Ok(names)
}

/// Drop scope directories left empty by removals
fn remove_empty_scopes(fs: &dyn FileSystem, store_root: &Path) -> Result<()> {
    if !fs.is_dir(store_root) {
        return Ok(());
    }
    for entry in fs.read_dir(store_root)? {
        if entry.is_dir() && entry.name.starts_with('@') && fs.read_dir(&entry.path)?.is_empty() {
            fs.remove_dir_all(&entry.path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::exec::MockRunner;
    use crate::fs::MockFileSystem;
    use crate::pipeline::stages::assemble::AssembledSource;
    use crate::pipeline::stages::resolve::{DependencyStore, STORE_DIR};
    use crate::pipeline::stages::transform::WorkspaceArtifacts;
    use crate::progress::NoOpHandler;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn add_store_package(fs: &MockFileSystem, name: &str, deps: &[&str]) {
        let deps_json: Vec<String> = deps
            .iter()
            .map(|d| format!(r#""{}": "^1.0.0""#, d))
            .collect();
        fs.add_file(
            format!("/work/{}/{}/package.json", STORE_DIR, name),
            format!(
                r#"{{"name": "{}", "version": "1.0.0", "dependencies": {{{}}}}}"#,
                name,
                deps_json.join(", ")
            ),
        );
    }

    fn seed(fs: &MockFileSystem) {
        fs.add_file(
            "/repo/package.json",
            r#"{"name": "acme",
                "workspaces": ["core", "server"],
                "devDependencies": {"typescript": "^5.3.0"}}"#,
        );
        fs.add_file("/repo/package-lock.json", "{}");
        fs.add_file(
            "/repo/core/package.json",
            r#"{"name": "@acme/core", "dependencies": {"zod": "^3.22.0"}}"#,
        );
        fs.add_file(
            "/repo/server/package.json",
            r#"{"name": "@acme/server",
                "dependencies": {"express": "^4.18.0"},
                "devDependencies": {"vitest": "^1.0.0"}}"#,
        );

        add_store_package(fs, "express", &["body-parser"]);
        add_store_package(fs, "body-parser", &[]);
        add_store_package(fs, "zod", &[]);
        add_store_package(fs, "typescript", &[]);
        add_store_package(fs, "vitest", &[]);
        add_store_package(fs, "@acme/core", &["zod"]);
        add_store_package(fs, "@acme/server", &["express"]);
    }

    fn prepared_state(fs: &MockFileSystem) -> PipelineState {
        let mut state = PipelineState::default();
        state.workspaces =
            Some(WorkspaceSet::discover(fs, std::path::Path::new("/repo")).unwrap());
        state.store = Some(DependencyStore {
            root: PathBuf::from("/work").join(STORE_DIR),
            digest: "sha256:abc".to_string(),
            reused: false,
        });
        state.assembled = Some(AssembledSource {
            root: PathBuf::from("/work"),
            copied_files: 0,
        });
        state.artifacts = Some(WorkspaceArtifacts {
            dirs: BTreeMap::new(),
        });
        state
    }

    fn context(fs: Arc<MockFileSystem>) -> BuildContext {
        BuildContext::new(
            fs,
            Arc::new(MockRunner::new()),
            Arc::new(NoOpHandler),
            BuildConfig::default(),
            PathBuf::from("/repo"),
            PathBuf::from("/work"),
            PathBuf::from("/out"),
        )
    }

    #[tokio::test]
    async fn test_dev_only_packages_removed_production_kept() {
        let fs = Arc::new(MockFileSystem::new());
        seed(&fs);
        let ctx = context(fs.clone());
        let mut state = prepared_state(&fs);

        PruneStage.execute(&ctx, &mut state).await.unwrap();
        let pruned = state.pruned.unwrap();

        assert!(fs.is_dir(Path::new("/work/node_modules/express")));
        assert!(fs.is_dir(Path::new("/work/node_modules/zod")));
        assert!(!fs.exists(Path::new("/work/node_modules/typescript")));
        assert!(!fs.exists(Path::new("/work/node_modules/vitest")));
        assert_eq!(
            pruned.removed,
            vec!["typescript".to_string(), "vitest".to_string()]
        );
    }

    #[tokio::test]
    async fn test_transitive_production_dependencies_kept() {
        let fs = Arc::new(MockFileSystem::new());
        seed(&fs);
        let ctx = context(fs.clone());
        let mut state = prepared_state(&fs);

        PruneStage.execute(&ctx, &mut state).await.unwrap();

        // body-parser is only reachable through express
        assert!(fs.is_dir(Path::new("/work/node_modules/body-parser")));
        assert!(state
            .pruned
            .unwrap()
            .kept
            .contains(&"body-parser".to_string()));
    }

    #[tokio::test]
    async fn test_workspace_links_survive_pruning() {
        let fs = Arc::new(MockFileSystem::new());
        seed(&fs);
        let ctx = context(fs.clone());
        let mut state = prepared_state(&fs);

        PruneStage.execute(&ctx, &mut state).await.unwrap();

        assert!(fs.is_dir(Path::new("/work/node_modules/@acme/core")));
        assert!(fs.is_dir(Path::new("/work/node_modules/@acme/server")));
    }

    #[tokio::test]
    async fn test_missing_store_entry_is_fatal_prune_error() {
        let fs = Arc::new(MockFileSystem::new());
        seed(&fs);
        fs.remove_dir_all(Path::new("/work/node_modules/zod")).unwrap();
        let ctx = context(fs.clone());
        let mut state = prepared_state(&fs);

        let err = PruneStage.execute(&ctx, &mut state).await.unwrap_err();
        let pipeline_err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(pipeline_err, PipelineError::Prune(_)));
        assert!(err.to_string().contains("zod"));
        assert!(state.pruned.is_none());
    }

    #[tokio::test]
    async fn test_dev_dependencies_never_seed_the_closure() {
        let fs = Arc::new(MockFileSystem::new());
        seed(&fs);
        // typescript depends on something that would vanish with it
        add_store_package(&fs, "typescript", &["tslib"]);
        add_store_package(&fs, "tslib", &[]);
        let ctx = context(fs.clone());
        let mut state = prepared_state(&fs);

        PruneStage.execute(&ctx, &mut state).await.unwrap();

        assert!(!fs.exists(Path::new("/work/node_modules/typescript")));
        assert!(!fs.exists(Path::new("/work/node_modules/tslib")));
    }
}
