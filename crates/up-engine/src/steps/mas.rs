use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

#[derive(Debug)]
pub struct MasStep;

#[async_trait::async_trait]
impl Step for MasStep {
    fn id(&self) -> &str {
        "mas"
    }

    fn name(&self) -> &str {
        "Mac App Store"
    }

    fn description(&self) -> &str {
        "Upgrade all Mac App Store apps via the mas CLI tool"
    }

    fn install_package(&self) -> Option<&str> {
        Some("mas")
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "mas").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command("mas upgrade").await?;
        Ok(())
    }
}
