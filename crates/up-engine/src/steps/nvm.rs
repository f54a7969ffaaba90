use std::path::PathBuf;

use anyhow::Result;
use up_runner::ShellRunner;

use crate::step::{check_path_exists, Step, StepContext};

fn nvm_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nvm")
}

// nvm is a shell function sourced from nvm.sh, not a standalone binary, so
// it has to be sourced explicitly inside each bash invocation.
fn nvm_install_command() -> String {
    let dir = nvm_dir();
    format!(
        "export NVM_DIR=\"{dir}\" && source \"$NVM_DIR/nvm.sh\" --no-use && \
         CURRENT_NODE_VERSION=\"$(nvm current)\" && \
         if [ \"$CURRENT_NODE_VERSION\" = \"none\" ] || [ \"$CURRENT_NODE_VERSION\" = \"system\" ]; then \
         nvm install node; \
         else \
         nvm install node --reinstall-packages-from=\"$CURRENT_NODE_VERSION\"; \
         fi",
        dir = dir.display()
    )
}

#[derive(Debug)]
pub struct NvmStep;

#[async_trait::async_trait]
impl Step for NvmStep {
    fn id(&self) -> &str {
        "nvm"
    }

    fn name(&self) -> &str {
        "Node.js (nvm)"
    }

    fn description(&self) -> &str {
        "Install the latest Node.js via nvm, migrating packages from the current version"
    }

    async fn check_available(&self, shell: &ShellRunner) -> bool {
        let script = nvm_dir().join("nvm.sh");
        check_path_exists(shell, &script.to_string_lossy()).await
    }

    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.run_command(&nvm_install_command()).await?;
        Ok(())
    }
}
