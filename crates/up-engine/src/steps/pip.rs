use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_command_exists, Step, StepContext};

// Updating every outdated global package can occasionally break tools that
// pin specific versions, hence the warning on the run prompt.
const PIP_UPDATE_ALL_OUTDATED: &str =
    "pip3 list --outdated --format=columns | tail -n +3 | awk '{print $1}' | xargs -n1 pip3 install -U";

#[derive(Debug)]
pub struct PipStep;

#[async_trait::async_trait]
impl Step for PipStep {
    fn id(&self) -> &str {
        "pip"
    }

    fn name(&self) -> &str {
        "pip3"
    }

    fn description(&self) -> &str {
        "Update all globally installed pip3 packages"
    }

    fn warning(&self) -> Option<&str> {
        Some("Upgrading all global packages can break tools pinned to specific versions")
    }

    // No install package: pip3 comes with Python.
    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_command_exists(shell, "pip3").await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command(PIP_UPDATE_ALL_OUTDATED).await?;
        Ok(())
    }
}
