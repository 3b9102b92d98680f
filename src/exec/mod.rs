//! Command execution seam for the two external build invocations
//!
//! The resolver and transformer each issue exactly one command over the whole
//! tree. Hiding the invocation behind a trait keeps the stages testable
//! without a package manager on PATH.

mod mock;
mod process;

pub use mock::MockRunner;
pub use process::ProcessRunner;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Captured result of one command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs one shell command line in a working directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path, env: &[(String, String)])
        -> Result<CommandOutput>;
}
