use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

#[derive(Debug)]
pub struct CleanupStep;

#[async_trait::async_trait]
impl Step for CleanupStep {
    fn id(&self) -> &str {
        "cleanup"
    }

    fn name(&self) -> &str {
        "Cleanup"
    }

    fn description(&self) -> &str {
        "Remove outdated Homebrew downloads and cached versions"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "brew").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("brew cleanup").await?;
        Ok(())
    }
}
