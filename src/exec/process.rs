//! Real command execution through the system shell

use super::{CommandOutput, CommandRunner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// CommandRunner backed by `sh -c`, the same form build scripts use
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput> {
        debug!(command, cwd = %cwd.display(), "Running command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run '{}' in {}", command, cwd.display()))?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
