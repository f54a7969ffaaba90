//! The orchestration engine: drives each step through its lifecycle phases
//! and emits a full state snapshot after every externally observable
//! transition.
//!
//! Steps run strictly in order, each to completion (including install
//! sub-phases) before the next begins, so at most one shell command is ever
//! active, the invariant behind the supervisor's single cancel handle.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use up_core::{
    CompletedStepRecord, ConfirmationAnswer, DisplayStep, OutputLine, Prompt, PromptMode,
    ResolvedVersion, RunState, StepPhase,
};
use up_runner::{LogFactory, RunnerError, ShellRunner};

use crate::step::{Step, StepContext};

/// Answers confirmation prompts. Consulted only while prompt-mode is
/// interactive.
#[async_trait::async_trait]
pub trait ConfirmationOracle: Send {
    async fn ask(&mut self) -> ConfirmationAnswer;
}

/// Collects the final version report, exactly once, after the last step.
#[async_trait::async_trait]
pub trait VersionCollector: Send + Sync {
    async fn collect(&self) -> Vec<ResolvedVersion>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub prompt_mode: PromptMode,
    /// Installer command prefix for steps that declare an install package.
    pub installer: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            prompt_mode: PromptMode::Interactive,
            installer: "brew install".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptDecision {
    Run,
    Skip,
}

struct PromptResolution {
    mode: PromptMode,
    decision: PromptDecision,
}

async fn resolve_prompt(
    mode: PromptMode,
    oracle: &mut (dyn ConfirmationOracle + Send),
) -> PromptResolution {
    if mode == PromptMode::AutoAccept {
        return PromptResolution {
            mode: PromptMode::AutoAccept,
            decision: PromptDecision::Run,
        };
    }
    match oracle.ask().await {
        ConfirmationAnswer::No => PromptResolution {
            mode: PromptMode::Interactive,
            decision: PromptDecision::Skip,
        },
        ConfirmationAnswer::Force => PromptResolution {
            mode: PromptMode::AutoAccept,
            decision: PromptDecision::Run,
        },
        ConfirmationAnswer::Yes => PromptResolution {
            mode: PromptMode::Interactive,
            decision: PromptDecision::Run,
        },
    }
}

fn was_canceled(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<RunnerError>(),
        Some(RunnerError::Canceled { .. })
    )
}

fn to_display_steps(steps: &[Arc<dyn Step>]) -> Vec<DisplayStep> {
    steps
        .iter()
        .map(|step| DisplayStep {
            id: step.id().to_string(),
            name: step.name().to_string(),
            description: step.description().to_string(),
        })
        .collect()
}

pub struct UpdateEngine {
    shell: Arc<ShellRunner>,
    logs: Arc<dyn LogFactory>,
}

impl UpdateEngine {
    pub fn new(shell: Arc<ShellRunner>, logs: Arc<dyn LogFactory>) -> Self {
        Self { shell, logs }
    }

    /// The supervisor handle, for wiring external cancellation.
    pub fn shell(&self) -> Arc<ShellRunner> {
        self.shell.clone()
    }

    /// Drive every step through its lifecycle. Step failures (including
    /// install failures and user cancellation) are recorded and the loop
    /// continues; the only errors that propagate out of here are collaborator
    /// failures (log sink creation), which end the run abnormally.
    pub async fn run(
        &self,
        steps: &[Arc<dyn Step>],
        options: EngineOptions,
        oracle: &mut (dyn ConfirmationOracle + Send),
        versions: &dyn VersionCollector,
        on_state: &mut (dyn FnMut(&RunState) + Send),
    ) -> Result<RunState> {
        let mut state = RunState::new(to_display_steps(steps));
        let mut prompt_mode = options.prompt_mode;
        on_state(&state);

        for (index, step) in steps.iter().enumerate() {
            state.current_step_index = index;
            state.current_phase = StepPhase::CheckingAvailability;
            state.output_lines.clear();
            state.prompt = None;
            on_state(&state);

            let available = step.check_available(&self.shell).await;
            info!(step = step.id(), available, "checked availability");

            if !available {
                let Some(package) = step.install_package().map(str::to_string) else {
                    state.current_phase = StepPhase::NotAvailable;
                    state.completed.push(CompletedStepRecord::new(
                        StepPhase::NotAvailable,
                        "not installed",
                    ));
                    on_state(&state);
                    continue;
                };

                let install_command = format!("{} {}", options.installer, package);

                state.current_phase = StepPhase::PromptingToInstall;
                state.prompt = Some(Prompt {
                    question: format!("Install {}? ({})", step.name(), install_command),
                    warning: None,
                });
                on_state(&state);

                let resolution = resolve_prompt(prompt_mode, oracle).await;
                prompt_mode = resolution.mode;
                state.prompt = None;

                if resolution.decision == PromptDecision::Skip {
                    state.current_phase = StepPhase::Skipped;
                    state.completed.push(CompletedStepRecord::bare(StepPhase::Skipped));
                    on_state(&state);
                    continue;
                }

                state.current_phase = StepPhase::Installing;
                on_state(&state);

                let install_log = self
                    .logs
                    .create(&format!("{}-install", step.id()))
                    .await?;
                let install_result = {
                    let emit = |line: OutputLine| {
                        state.output_lines.push(line);
                        on_state(&state);
                    };
                    self.shell
                        .run_streaming(&install_command, emit, &*install_log)
                        .await
                };

                match install_result {
                    Ok(()) => {
                        info!(step = step.id(), "install completed");
                        state.output_lines.clear();
                    }
                    Err(error) => {
                        let canceled = matches!(error, RunnerError::Canceled { .. });
                        if canceled {
                            // The user is trying to regain control; re-prompt
                            // from here on.
                            prompt_mode = PromptMode::Interactive;
                        }
                        info!(step = step.id(), %error, "install failed");
                        state.current_phase = StepPhase::Failed;
                        state.output_lines.clear();
                        state.completed.push(CompletedStepRecord::new(
                            StepPhase::Failed,
                            if canceled { "canceled by user" } else { "install failed" },
                        ));
                        on_state(&state);
                        continue;
                    }
                }
            }

            state.current_phase = StepPhase::PromptingToRun;
            state.prompt = Some(Prompt {
                question: format!("Run {} update?", step.name()),
                warning: step.warning().map(str::to_string),
            });
            on_state(&state);

            let resolution = resolve_prompt(prompt_mode, oracle).await;
            prompt_mode = resolution.mode;
            state.prompt = None;

            if resolution.decision == PromptDecision::Skip {
                state.current_phase = StepPhase::Skipped;
                state.completed.push(CompletedStepRecord::bare(StepPhase::Skipped));
                on_state(&state);
                continue;
            }

            state.current_phase = StepPhase::Running;
            state.output_lines.clear();
            on_state(&state);

            let step_log = self.logs.create(step.id()).await?;
            let outcome = {
                let mut emit = |line: OutputLine| {
                    state.output_lines.push(line);
                    on_state(&state);
                };
                let mut ctx = StepContext::new(&self.shell, step_log, &mut emit);
                step.run(&mut ctx).await
            };

            match outcome {
                Ok(()) => {
                    info!(step = step.id(), "step complete");
                    state.current_phase = StepPhase::Complete;
                    state.output_lines.clear();
                    state
                        .completed
                        .push(CompletedStepRecord::new(StepPhase::Complete, "updated"));
                    on_state(&state);
                }
                Err(error) => {
                    let canceled = was_canceled(&error);
                    if canceled {
                        prompt_mode = PromptMode::Interactive;
                    }
                    info!(step = step.id(), %error, "step failed");
                    state.current_phase = StepPhase::Failed;
                    state.output_lines.clear();
                    state.completed.push(CompletedStepRecord::new(
                        StepPhase::Failed,
                        if canceled {
                            "canceled by user".to_string()
                        } else {
                            error.to_string()
                        },
                    ));
                    on_state(&state);
                }
            }
        }

        state.finished = true;
        state.output_lines.clear();
        state.prompt = None;
        on_state(&state);

        state.version_report = Some(versions.collect().await);
        on_state(&state);

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use anyhow::anyhow;
    use up_core::OutputSource;
    use up_runner::MemoryLogFactory;

    #[derive(Debug)]
    enum Behavior {
        Succeed,
        Fail(&'static str),
        Canceled,
    }

    #[derive(Debug)]
    struct MockStep {
        id: &'static str,
        warning: Option<&'static str>,
        install: Option<&'static str>,
        available: bool,
        behavior: Behavior,
        ran: Arc<AtomicBool>,
    }

    impl MockStep {
        fn new(id: &'static str, available: bool, behavior: Behavior) -> Self {
            Self {
                id,
                warning: None,
                install: None,
                available,
                behavior,
                ran: Arc::new(AtomicBool::new(false)),
            }
        }

        fn with_install(mut self, package: &'static str) -> Self {
            self.install = Some(package);
            self
        }

        fn ran_handle(&self) -> Arc<AtomicBool> {
            self.ran.clone()
        }
    }

    #[async_trait::async_trait]
    impl Step for MockStep {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn description(&self) -> &str {
            "mock step"
        }

        fn warning(&self) -> Option<&str> {
            self.warning
        }

        fn install_package(&self) -> Option<&str> {
            self.install
        }

        async fn check_available(&self, _shell: &ShellRunner) -> bool {
            self.available
        }

        async fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
            self.ran.store(true, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed => {
                    ctx.emit_line("working", OutputSource::Stdout);
                    Ok(())
                }
                Behavior::Fail(message) => Err(anyhow!(*message)),
                Behavior::Canceled => Err(RunnerError::Canceled {
                    command: "mock".to_string(),
                }
                .into()),
            }
        }
    }

    struct ScriptedOracle {
        answers: VecDeque<ConfirmationAnswer>,
        calls: usize,
    }

    impl ScriptedOracle {
        fn new(answers: impl IntoIterator<Item = ConfirmationAnswer>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                calls: 0,
            }
        }

        fn always_yes() -> Self {
            Self::new([])
        }
    }

    #[async_trait::async_trait]
    impl ConfirmationOracle for ScriptedOracle {
        async fn ask(&mut self) -> ConfirmationAnswer {
            self.calls += 1;
            self.answers.pop_front().unwrap_or(ConfirmationAnswer::Yes)
        }
    }

    struct FixedVersions {
        calls: AtomicUsize,
    }

    impl FixedVersions {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl VersionCollector for FixedVersions {
        async fn collect(&self) -> Vec<ResolvedVersion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vec![ResolvedVersion {
                label: "tool".to_string(),
                value: "v1".to_string(),
            }]
        }
    }

    fn engine() -> (UpdateEngine, MemoryLogFactory) {
        let logs = MemoryLogFactory::new();
        let engine = UpdateEngine::new(Arc::new(ShellRunner::new()), Arc::new(logs.clone()));
        (engine, logs)
    }

    /// Installer used in tests so the install sub-phase runs a harmless
    /// command through real bash.
    fn test_options() -> EngineOptions {
        EngineOptions {
            prompt_mode: PromptMode::Interactive,
            installer: "echo install".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_step_is_recorded_as_updated() {
        let (engine, _logs) = engine();
        let step = MockStep::new("a", true, Behavior::Succeed);
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(step)];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(
            state.completed,
            vec![CompletedStepRecord::new(StepPhase::Complete, "updated")]
        );
        assert!(state.output_lines.is_empty());
        assert!(state.finished);
        assert_eq!(versions.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state.version_report,
            Some(vec![ResolvedVersion {
                label: "tool".to_string(),
                value: "v1".to_string(),
            }])
        );
    }

    #[tokio::test]
    async fn records_match_step_order_and_count() {
        let (engine, _logs) = engine();
        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(MockStep::new("a", true, Behavior::Succeed)),
            Arc::new(MockStep::new("b", false, Behavior::Succeed)),
            Arc::new(MockStep::new("c", true, Behavior::Fail("boom"))),
        ];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(state.completed.len(), steps.len());
        assert_eq!(state.completed[0].phase, StepPhase::Complete);
        assert_eq!(state.completed[1].phase, StepPhase::NotAvailable);
        assert_eq!(state.completed[2].phase, StepPhase::Failed);
        assert_eq!(state.completed[2].summary_note.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn unavailable_step_without_hint_never_runs() {
        let (engine, _logs) = engine();
        let step = MockStep::new("a", false, Behavior::Succeed);
        let ran = step.ran_handle();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(step)];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(
            state.completed,
            vec![CompletedStepRecord::new(
                StepPhase::NotAvailable,
                "not installed"
            )]
        );
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(oracle.calls, 0);
    }

    #[tokio::test]
    async fn declined_install_skips_step_entirely() {
        let (engine, logs) = engine();
        let step = MockStep::new("a", false, Behavior::Succeed).with_install("pkg");
        let ran = step.ran_handle();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(step)];
        let mut oracle = ScriptedOracle::new([ConfirmationAnswer::No]);
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(state.completed, vec![CompletedStepRecord::bare(StepPhase::Skipped)]);
        assert!(!ran.load(Ordering::SeqCst));
        // No install log sink was ever created.
        assert!(!logs.scopes().contains(&"a-install".to_string()));
    }

    #[tokio::test]
    async fn declined_run_skips_step() {
        let (engine, _logs) = engine();
        let step = MockStep::new("a", true, Behavior::Succeed);
        let ran = step.ran_handle();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(step)];
        let mut oracle = ScriptedOracle::new([ConfirmationAnswer::No]);
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(state.completed, vec![CompletedStepRecord::bare(StepPhase::Skipped)]);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn force_auto_accepts_remaining_prompts() {
        let (engine, _logs) = engine();
        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(MockStep::new("a", true, Behavior::Succeed)),
            Arc::new(MockStep::new("b", true, Behavior::Succeed)),
            Arc::new(MockStep::new("c", true, Behavior::Succeed)),
        ];
        let mut oracle = ScriptedOracle::new([ConfirmationAnswer::Force]);
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(oracle.calls, 1);
        assert!(state
            .completed
            .iter()
            .all(|record| record.phase == StepPhase::Complete));
    }

    #[tokio::test]
    async fn cancellation_resets_auto_accept_mode() {
        let (engine, _logs) = engine();
        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(MockStep::new("a", true, Behavior::Canceled)),
            Arc::new(MockStep::new("b", true, Behavior::Succeed)),
        ];
        // Force on step a would auto-accept b; the cancellation must bring
        // the prompt back.
        let mut oracle =
            ScriptedOracle::new([ConfirmationAnswer::Force, ConfirmationAnswer::Yes]);
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(oracle.calls, 2);
        assert_eq!(
            state.completed[0],
            CompletedStepRecord::new(StepPhase::Failed, "canceled by user")
        );
        assert_eq!(state.completed[1].phase, StepPhase::Complete);
    }

    #[tokio::test]
    async fn install_then_run_scenario() {
        let (engine, logs) = engine();
        let a = MockStep::new("a", true, Behavior::Succeed);
        let b = MockStep::new("b", false, Behavior::Succeed).with_install("x");
        let b_ran = b.ran_handle();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(a), Arc::new(b)];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let state = engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(
            state.completed,
            vec![
                CompletedStepRecord::new(StepPhase::Complete, "updated"),
                CompletedStepRecord::new(StepPhase::Complete, "updated"),
            ]
        );
        assert!(b_ran.load(Ordering::SeqCst));
        assert_eq!(versions.calls.load(Ordering::SeqCst), 1);
        // Install ran through the supervisor with its own log scope.
        assert_eq!(logs.lines("b-install"), vec!["install x"]);
    }

    #[tokio::test]
    async fn failed_install_is_not_fatal_to_the_run() {
        let (engine, _logs) = engine();
        let b = MockStep::new("b", false, Behavior::Succeed).with_install("x");
        let b_ran = b.ran_handle();
        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(b),
            Arc::new(MockStep::new("c", true, Behavior::Succeed)),
        ];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let options = EngineOptions {
            prompt_mode: PromptMode::Interactive,
            installer: "false".to_string(),
        };
        let state = engine
            .run(&steps, options, &mut oracle, &versions, &mut |_| {})
            .await
            .unwrap();

        assert_eq!(
            state.completed[0],
            CompletedStepRecord::new(StepPhase::Failed, "install failed")
        );
        assert!(!b_ran.load(Ordering::SeqCst));
        assert_eq!(state.completed[1].phase, StepPhase::Complete);
    }

    #[tokio::test]
    async fn snapshots_are_emitted_in_order() {
        let (engine, _logs) = engine();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(MockStep::new("a", true, Behavior::Succeed))];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let mut observed: Vec<(StepPhase, bool, bool)> = Vec::new();
        engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |state| {
                observed.push((
                    state.current_phase,
                    state.prompt.is_some(),
                    state.finished,
                ));
            })
            .await
            .unwrap();

        let phases: Vec<StepPhase> = observed.iter().map(|(phase, _, _)| *phase).collect();
        assert_eq!(phases[0], StepPhase::CheckingAvailability);
        assert!(phases.contains(&StepPhase::PromptingToRun));
        assert!(phases.contains(&StepPhase::Running));
        assert!(phases.contains(&StepPhase::Complete));
        // The prompt is visible while prompting and gone afterwards.
        assert!(observed
            .iter()
            .any(|(phase, prompted, _)| *phase == StepPhase::PromptingToRun && *prompted));
        // Completion is flagged before the version report lands, and the
        // final emission carries it too.
        assert!(observed.last().map(|(_, _, finished)| *finished).unwrap_or(false));
    }

    #[tokio::test]
    async fn output_buffer_is_clear_in_terminal_snapshots() {
        let (engine, _logs) = engine();
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(MockStep::new("a", true, Behavior::Succeed))];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let mut saw_running_output = false;
        let mut buffer_clean_outside_activity = true;
        engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |state| {
                match state.current_phase {
                    StepPhase::Running | StepPhase::Installing => {
                        if !state.output_lines.is_empty() {
                            saw_running_output = true;
                        }
                    }
                    _ => {
                        if !state.output_lines.is_empty() {
                            buffer_clean_outside_activity = false;
                        }
                    }
                }
            })
            .await
            .unwrap();

        assert!(saw_running_output);
        assert!(buffer_clean_outside_activity);
    }

    #[tokio::test]
    async fn run_prompt_carries_step_warning() {
        let (engine, _logs) = engine();
        let mut step = MockStep::new("a", true, Behavior::Succeed);
        step.warning = Some("may require a restart");
        let steps: Vec<Arc<dyn Step>> = vec![Arc::new(step)];
        let mut oracle = ScriptedOracle::always_yes();
        let versions = FixedVersions::new();

        let mut warning_seen = false;
        engine
            .run(&steps, test_options(), &mut oracle, &versions, &mut |state| {
                if let Some(prompt) = &state.prompt {
                    if prompt.warning.as_deref() == Some("may require a restart") {
                        warning_seen = true;
                    }
                }
            })
            .await
            .unwrap();

        assert!(warning_seen);
    }
}
