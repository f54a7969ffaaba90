//! Final version report: one capture per configured tool, run after the
//! last step finalizes.

use std::sync::Arc;

use up_core::ResolvedVersion;
use up_runner::ShellRunner;

use crate::engine::VersionCollector;

const NOT_INSTALLED: &str = "not installed";

#[derive(Debug, Clone)]
pub struct VersionProbe {
    pub label: String,
    pub command: String,
}

impl VersionProbe {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

pub struct SystemVersionCollector {
    shell: Arc<ShellRunner>,
    probes: Vec<VersionProbe>,
}

impl SystemVersionCollector {
    pub fn new(shell: Arc<ShellRunner>) -> Self {
        Self::with_probes(shell, default_probes())
    }

    pub fn with_probes(shell: Arc<ShellRunner>, probes: Vec<VersionProbe>) -> Self {
        Self { shell, probes }
    }
}

pub fn default_probes() -> Vec<VersionProbe> {
    vec![
        VersionProbe::new("macOS", "sw_vers -productVersion"),
        VersionProbe::new("Homebrew", "brew --version | head -n 1"),
        VersionProbe::new("Node", "node -v"),
        VersionProbe::new("NPM", "npm -v"),
        VersionProbe::new("Python", "python3 --version"),
        VersionProbe::new("pyenv", "pyenv --version"),
        VersionProbe::new(".NET SDK", "dotnet --version"),
    ]
}

#[async_trait::async_trait]
impl VersionCollector for SystemVersionCollector {
    async fn collect(&self) -> Vec<ResolvedVersion> {
        let mut report = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let value = self.shell.capture_trimmed(&probe.command).await;
            report.push(ResolvedVersion {
                label: probe.label.clone(),
                value: if value.is_empty() {
                    NOT_INSTALLED.to_string()
                } else {
                    value
                },
            });
        }
        report
    }
}
