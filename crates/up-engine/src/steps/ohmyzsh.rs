use std::path::PathBuf;

use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_path_exists, Step, StepContext};

fn upgrade_script_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".oh-my-zsh")
        .join("tools")
        .join("upgrade.sh")
}

#[derive(Debug)]
pub struct OhMyZshStep;

#[async_trait::async_trait]
impl Step for OhMyZshStep {
    fn id(&self) -> &str {
        "ohmyzsh"
    }

    fn name(&self) -> &str {
        "Oh My Zsh"
    }

    fn description(&self) -> &str {
        "Update Oh My Zsh to the latest version"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        check_path_exists(shell, &upgrade_script_path().to_string_lossy()).await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command(&format!("zsh \"{}\"", upgrade_script_path().display()))
            .await?;
        Ok(())
    }
}
