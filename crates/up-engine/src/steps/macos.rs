use anyhow::Result;
use up_core::OutputSource;
use up_runner::ShellRunner;

use crate::step::{Step, StepContext};

#[derive(Debug)]
pub struct MacosStep;

#[async_trait::async_trait]
impl Step for MacosStep {
    fn id(&self) -> &str {
        "macos"
    }

    fn name(&self) -> &str {
        "macOS"
    }

    fn description(&self) -> &str {
        "Check for and optionally install macOS system software updates"
    }

    fn warning(&self) -> Option<&str> {
        Some("Installing macOS updates may require a restart")
    }

    // softwareupdate always exists on macOS
    async fn check_available(&self, _shell: &ShellRunner) -> bool {
        true
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let update_list = ctx.capture_command("softwareupdate -l 2>&1").await;
        ctx.append_log(&update_list).await?;

        if update_list.contains("No new software available") {
            ctx.emit_line("macOS is already up to date.", OutputSource::Stdout);
            return Ok(());
        }

        ctx.emit_line(update_list, OutputSource::Stdout);
        ctx.emit_line("Updates found, installing now...", OutputSource::Stdout);
        ctx.run_command("softwareupdate -ia --verbose").await?;
        Ok(())
    }
}
