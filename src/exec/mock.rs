//! Scripted command runner for tests

use super::{CommandOutput, CommandRunner};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

/// CommandRunner that records invocations and replays scripted outputs.
///
/// Unscripted commands succeed with empty output, so tests only script the
/// failures they care about.
#[derive(Debug, Default)]
pub struct MockRunner {
    outputs: Mutex<HashMap<String, CommandOutput>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output for an exact command line
    pub fn script(&self, command: impl Into<String>, output: CommandOutput) {
        self.outputs.lock().unwrap().insert(command.into(), output);
    }

    /// Script a nonzero exit for an exact command line
    pub fn fail(&self, command: impl Into<String>, stderr: impl Into<String>) {
        self.script(command, CommandOutput::failed(1, stderr));
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// How many times `command` was run
    pub fn count_of(&self, command: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.command == command)
            .count()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            env: env.to_vec(),
        });

        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_commands_succeed() {
        let runner = MockRunner::new();
        let output = runner.run("npm ci", Path::new("/repo"), &[]).await.unwrap();
        assert!(output.success());
        assert_eq!(runner.count_of("npm ci"), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_replayed() {
        let runner = MockRunner::new();
        runner.fail("npm run build", "TS2304: cannot find name");

        let output = runner
            .run("npm run build", Path::new("/repo"), &[])
            .await
            .unwrap();
        assert!(!output.success());
        assert!(output.stderr.contains("TS2304"));
    }
}
