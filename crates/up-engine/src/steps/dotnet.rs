use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

#[derive(Debug)]
pub struct DotnetStep;

#[async_trait::async_trait]
impl Step for DotnetStep {
    fn id(&self) -> &str {
        "dotnet"
    }

    fn name(&self) -> &str {
        ".NET"
    }

    fn description(&self) -> &str {
        "Update all globally installed .NET tools"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "dotnet").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("dotnet tool update --global --all").await?;
        Ok(())
    }
}
