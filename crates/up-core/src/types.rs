use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Step lifecycle ──

/// Lifecycle state of the step currently being processed. Exactly one step
/// holds a non-terminal phase at any time; every earlier step holds a
/// terminal phase and every later step is `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepPhase {
    Pending,
    CheckingAvailability,
    PromptingToInstall,
    Installing,
    PromptingToRun,
    Running,
    Complete,
    Failed,
    Skipped,
    NotAvailable,
}

impl StepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CheckingAvailability => "checking-availability",
            Self::PromptingToInstall => "prompting-to-install",
            Self::Installing => "installing",
            Self::PromptingToRun => "prompting-to-run",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::NotAvailable => "not-available",
        }
    }

    /// Terminal phases end a step's lifecycle; the engine moves on.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Skipped | Self::NotAvailable
        )
    }
}

impl std::fmt::Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "checking-availability" => Ok(Self::CheckingAvailability),
            "prompting-to-install" => Ok(Self::PromptingToInstall),
            "installing" => Ok(Self::Installing),
            "prompting-to-run" => Ok(Self::PromptingToRun),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            "not-available" => Ok(Self::NotAvailable),
            other => Err(format!("unknown StepPhase: {other}")),
        }
    }
}

/// Audit-trail entry for a finalized step. Appended exactly once per step,
/// in step order, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedStepRecord {
    pub phase: StepPhase,
    pub summary_note: Option<String>,
}

impl CompletedStepRecord {
    pub fn new(phase: StepPhase, summary_note: impl Into<String>) -> Self {
        Self {
            phase,
            summary_note: Some(summary_note.into()),
        }
    }

    pub fn bare(phase: StepPhase) -> Self {
        Self {
            phase,
            summary_note: None,
        }
    }
}

// ── Command output ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One complete line of child-process output, tagged with its stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub text: String,
    pub source: OutputSource,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: OutputSource::Stdout,
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: OutputSource::Stderr,
        }
    }
}

// ── Prompting ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub question: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationAnswer {
    Yes,
    No,
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Interactive,
    AutoAccept,
}

// ── Run state ──

/// Display-only identity of a step; the snapshot never carries the step's
/// behavior, only what a renderer needs to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayStep {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    pub label: String,
    pub value: String,
}

/// The full engine snapshot, emitted to the state subscriber after every
/// externally observable transition. Renderers treat each emission as
/// read-only.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub steps: Vec<DisplayStep>,
    pub current_step_index: usize,
    pub current_phase: StepPhase,
    pub completed: Vec<CompletedStepRecord>,
    pub output_lines: Vec<OutputLine>,
    pub prompt: Option<Prompt>,
    pub finished: bool,
    pub version_report: Option<Vec<ResolvedVersion>>,
}

impl RunState {
    pub fn new(steps: Vec<DisplayStep>) -> Self {
        Self {
            steps,
            current_step_index: 0,
            current_phase: StepPhase::CheckingAvailability,
            completed: Vec::new(),
            output_lines: Vec::new(),
            prompt: None,
            finished: false,
            version_report: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_str() {
        for phase in [
            StepPhase::Pending,
            StepPhase::CheckingAvailability,
            StepPhase::PromptingToInstall,
            StepPhase::Installing,
            StepPhase::PromptingToRun,
            StepPhase::Running,
            StepPhase::Complete,
            StepPhase::Failed,
            StepPhase::Skipped,
            StepPhase::NotAvailable,
        ] {
            assert_eq!(phase.as_str().parse::<StepPhase>().unwrap(), phase);
        }
    }

    #[test]
    fn terminal_phases() {
        assert!(StepPhase::Complete.is_terminal());
        assert!(StepPhase::Failed.is_terminal());
        assert!(StepPhase::Skipped.is_terminal());
        assert!(StepPhase::NotAvailable.is_terminal());
        assert!(!StepPhase::Running.is_terminal());
        assert!(!StepPhase::Pending.is_terminal());
    }

    #[test]
    fn phase_serializes_kebab_case() {
        let json = serde_json::to_string(&StepPhase::PromptingToRun).unwrap();
        assert_eq!(json, "\"prompting-to-run\"");
    }

    #[test]
    fn initial_run_state() {
        let state = RunState::new(vec![DisplayStep {
            id: "homebrew".into(),
            name: "Homebrew".into(),
            description: "update".into(),
        }]);
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.current_phase, StepPhase::CheckingAvailability);
        assert!(state.completed.is_empty());
        assert!(state.output_lines.is_empty());
        assert!(state.prompt.is_none());
        assert!(!state.finished);
        assert!(state.version_report.is_none());
    }
}
