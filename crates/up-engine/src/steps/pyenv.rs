use anyhow::Result;
use up_core::OutputSource;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

const FIND_LATEST_STABLE_PYTHON: &str = r"pyenv install -l | grep -E '^\s+3\.[0-9]+\.[0-9]+$' | grep -vE 'dev|a[0-9]|b[0-9]|rc[0-9]' | tail -1 | tr -d ' '";

#[derive(Debug)]
pub struct PyenvStep;

#[async_trait::async_trait]
impl Step for PyenvStep {
    fn id(&self) -> &str {
        "pyenv"
    }

    fn name(&self) -> &str {
        "pyenv"
    }

    fn description(&self) -> &str {
        "Upgrade pyenv via Homebrew and install the latest Python 3.x"
    }

    fn install_package(&self) -> Option<&str> {
        Some("pyenv")
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "pyenv").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("brew upgrade pyenv").await?;

        let latest = ctx.capture_command(FIND_LATEST_STABLE_PYTHON).await;
        if latest.is_empty() {
            ctx.emit_line(
                "Could not determine latest Python version, skipping pyenv install.",
                OutputSource::Stderr,
            );
            return Ok(());
        }

        ctx.run_command(&format!("pyenv install --skip-existing {latest}"))
            .await?;
        Ok(())
    }
}
