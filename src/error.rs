//! Build pipeline error taxonomy
//!
//! Every build-time failure is fatal to the whole pipeline: no retries, no
//! partial promotion. Stages return `anyhow::Result` and attach one of these
//! typed errors so callers (and tests) can classify the failure, while the
//! orchestrator adds stage context on top.

use thiserror::Error;

/// Fatal build-time errors, one variant per pipeline hazard
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A workspace manifest referenced by the root manifest is missing or unreadable
    #[error("manifest error: {0}")]
    Manifest(String),

    /// The dependency-installation invocation failed to satisfy a declared constraint
    #[error("dependency resolution failed: {0}")]
    Resolve(String),

    /// A workspace failed to transform source into artifacts
    #[error("compilation failed: {0}")]
    Compile(String),

    /// Invalid or missing manifest reference during production-dependency removal
    #[error("prune failed: {0}")]
    Prune(String),

    /// Runtime image could not be assembled
    #[error("image assembly failed: {0}")]
    Image(String),

    /// A stage precondition was violated (a prior stage did not complete)
    #[error("stage precondition not met: {0}")]
    Precondition(&'static str),
}

impl PipelineError {
    pub fn missing_workspace(root: &std::path::Path, member: &str) -> Self {
        PipelineError::Manifest(format!(
            "workspace '{}' declared by {} has no manifest at the expected path",
            member,
            root.display()
        ))
    }
}

/// Runtime supervision errors; any of these exits the container non-zero
#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to drop privileges to uid={uid} gid={gid}: {source}")]
    PrivilegeDrop {
        uid: u32,
        gid: u32,
        source: std::io::Error,
    },

    #[error("failed to spawn process '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("process exited with status {status} while supervised")]
    ProcessExited { status: i32 },

    #[error("invalid probe parameters: {0}")]
    InvalidProbeParams(String),

    #[error("invalid value '{value}' for {var}: expected an integer port")]
    InvalidPort { var: String, value: String },
}
