use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

#[derive(Debug)]
pub struct NpmStep;

#[async_trait::async_trait]
impl Step for NpmStep {
    fn id(&self) -> &str {
        "npm"
    }

    fn name(&self) -> &str {
        "npm"
    }

    fn description(&self) -> &str {
        "Update all globally installed npm packages"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "npm").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("npm update -g").await?;
        Ok(())
    }
}
