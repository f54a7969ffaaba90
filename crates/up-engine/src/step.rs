//! The step capability contract and its execution context.
//!
//! Each maintenance action implements [`Step`] independently, using only the
//! [`StepContext`] handed to it. Steps share no mutable state and never see
//! the engine's snapshot; that isolation keeps the engine agnostic to what
//! any given step actually does.

use std::sync::Arc;

use anyhow::Result;

use up_core::{OutputLine, OutputSource};
use up_runner::{RunnerError, ShellRunner, StepLog};

/// One maintenance action: identity, availability probe, run operation.
#[async_trait::async_trait]
pub trait Step: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Shown alongside the run confirmation prompt.
    fn warning(&self) -> Option<&str> {
        None
    }

    /// Package name the orchestrator may offer to install via the fixed
    /// installer command when the step is unavailable.
    fn install_package(&self) -> Option<&str> {
        None
    }

    /// A failed probe means "unavailable", never an error.
    async fn check_available(&self, shell: &ShellRunner) -> bool;

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()>;
}

/// Capability set a running step uses to talk back to the engine. Owned by
/// the engine for the lifetime of one step's run, never shared across steps.
pub struct StepContext<'a> {
    shell: &'a ShellRunner,
    log: Arc<dyn StepLog>,
    emit: &'a mut (dyn FnMut(OutputLine) + Send),
}

impl<'a> StepContext<'a> {
    pub fn new(
        shell: &'a ShellRunner,
        log: Arc<dyn StepLog>,
        emit: &'a mut (dyn FnMut(OutputLine) + Send),
    ) -> Self {
        Self { shell, log, emit }
    }

    /// Push a line into the snapshot's output buffer.
    pub fn emit_line(&mut self, text: impl Into<String>, source: OutputSource) {
        (self.emit)(OutputLine {
            text: text.into(),
            source,
        });
    }

    /// Append a line to this step's persistent log.
    pub async fn append_log(&mut self, line: &str) -> Result<()> {
        self.log.append(line).await
    }

    /// Run a shell command to completion, streaming its output to the
    /// snapshot buffer and the step log.
    pub async fn run_command(&mut self, command: &str) -> Result<(), RunnerError> {
        self.shell
            .run_streaming(command, &mut *self.emit, &*self.log)
            .await
    }

    /// Capture a command's trimmed stdout without streaming.
    pub async fn capture_command(&mut self, command: &str) -> String {
        self.shell.capture_trimmed(command).await
    }
}

/// Availability probe: the command resolves on `$PATH`.
pub async fn check_command_exists(shell: &ShellRunner, command: &str) -> bool {
    shell.succeeds(&format!("command -v {command}")).await
}

/// Availability probe: the path exists.
pub async fn check_path_exists(shell: &ShellRunner, path: &str) -> bool {
    shell.succeeds(&format!("test -e \"{path}\"")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_probe() {
        let shell = ShellRunner::new();
        assert!(check_command_exists(&shell, "bash").await);
        assert!(!check_command_exists(&shell, "nonexistent_cmd_xyz_99999").await);
    }

    #[tokio::test]
    async fn path_probe() {
        let shell = ShellRunner::new();
        assert!(check_path_exists(&shell, "/").await);
        assert!(!check_path_exists(&shell, "/nonexistent/path/xyz").await);
    }
}
