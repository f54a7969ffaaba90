use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

#[derive(Debug)]
pub struct HomebrewStep;

#[async_trait::async_trait]
impl Step for HomebrewStep {
    fn id(&self) -> &str {
        "homebrew"
    }

    fn name(&self) -> &str {
        "Homebrew"
    }

    fn description(&self) -> &str {
        "Update Homebrew itself and upgrade all installed formulae"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "brew").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("brew update && brew upgrade").await?;
        Ok(())
    }
}
