//! Pipeline context for managing dependencies

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::BuildConfig;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::{NoOpHandler, ProgressHandler};

/// Context that owns all long-lived pipeline dependencies
pub struct BuildContext {
    /// File system abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Runner for the install and build invocations
    pub runner: Arc<dyn CommandRunner>,

    /// Progress event sink
    pub progress: Arc<dyn ProgressHandler>,

    /// Build configuration
    pub config: BuildConfig,

    /// Monorepo source root
    pub repo_path: PathBuf,

    /// Working directory the stages assemble into
    pub work_dir: PathBuf,

    /// Image output directory
    pub output_dir: PathBuf,

    /// Unique id of this build invocation
    pub build_id: String,
}

impl BuildContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
        progress: Arc<dyn ProgressHandler>,
        config: BuildConfig,
        repo_path: PathBuf,
        work_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            fs,
            runner,
            progress,
            config,
            repo_path,
            work_dir,
            output_dir,
            build_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Create a context with the real file system and process runner
    pub fn with_defaults(
        config: BuildConfig,
        repo_path: PathBuf,
        work_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self::new(
            Arc::new(RealFileSystem),
            Arc::new(ProcessRunner),
            Arc::new(NoOpHandler),
            config,
            repo_path,
            work_dir,
            output_dir,
        )
    }
}
