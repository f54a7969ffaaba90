//! `upkeep update` (and the bare `upkeep` invocation): run the maintenance
//! steps, rendering engine snapshots to the terminal and answering prompts
//! from stdin.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;

use up_core::{ConfirmationAnswer, Error, PromptMode, RunState, StepPhase};
use up_engine::steps::{all_steps, step_by_id};
use up_engine::{ConfirmationOracle, EngineOptions, Step, SystemVersionCollector, UpdateEngine};
use up_runner::{FileLogFactory, ShellRunner};

use crate::config::{read_config, resolve_config_path, UpkeepConfig};

// ── Prompt answering ──

fn parse_answer(input: &str) -> Option<ConfirmationAnswer> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(ConfirmationAnswer::Yes),
        "n" | "no" => Some(ConfirmationAnswer::No),
        "f" | "force" => Some(ConfirmationAnswer::Force),
        _ => None,
    }
}

/// Answers prompts by reading lines from stdin. Unrecognized input re-asks;
/// end of input declines, so a closed stdin can never auto-approve anything.
struct StdinOracle {
    reader: BufReader<Stdin>,
}

impl StdinOracle {
    fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

#[async_trait::async_trait]
impl ConfirmationOracle for StdinOracle {
    async fn ask(&mut self) -> ConfirmationAnswer {
        loop {
            print!("{}", "  [y]es / [n]o / [f]orce all › ".dimmed());
            let _ = std::io::Write::flush(&mut std::io::stdout());

            let mut line = String::new();
            match self.reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return ConfirmationAnswer::No,
                Ok(_) => {}
            }
            if let Some(answer) = parse_answer(&line) {
                return answer;
            }
        }
    }
}

// ── Snapshot rendering ──

/// Renders engine snapshots incrementally. Snapshots are cumulative, so the
/// renderer tracks what it already printed and only emits the delta.
struct ConsoleRenderer {
    last_marker: Option<(usize, StepPhase)>,
    printed_lines: usize,
    versions_printed: bool,
}

impl ConsoleRenderer {
    fn new() -> Self {
        Self {
            last_marker: None,
            printed_lines: 0,
            versions_printed: false,
        }
    }

    fn render(&mut self, state: &RunState) {
        let marker = (state.current_step_index, state.current_phase);
        if self.last_marker != Some(marker) && !state.finished {
            self.last_marker = Some(marker);
            self.on_phase_entered(state);
        }

        if matches!(
            state.current_phase,
            StepPhase::Running | StepPhase::Installing
        ) {
            for line in &state.output_lines[self.printed_lines.min(state.output_lines.len())..] {
                match line.source {
                    up_core::OutputSource::Stdout => println!("  {}", line.text),
                    up_core::OutputSource::Stderr => println!("  {}", line.text.red()),
                }
            }
            self.printed_lines = state.output_lines.len();
        }

        if let Some(report) = &state.version_report {
            if !self.versions_printed {
                self.versions_printed = true;
                println!("\n{}", "Installed versions".bold());
                for version in report {
                    println!("  {:<10} {}", version.label, version.value.dimmed());
                }
            }
        }
    }

    fn on_phase_entered(&mut self, state: &RunState) {
        let step = &state.steps[state.current_step_index];
        match state.current_phase {
            StepPhase::CheckingAvailability => {
                println!("\n{}  {}", step.name.bold(), step.description.dimmed());
            }
            StepPhase::PromptingToInstall | StepPhase::PromptingToRun => {
                if let Some(prompt) = &state.prompt {
                    if let Some(warning) = &prompt.warning {
                        println!("  {} {}", "!".yellow().bold(), warning.yellow());
                    }
                    println!("  {} {}", "?".yellow().bold(), prompt.question);
                }
            }
            StepPhase::Installing => {
                self.printed_lines = 0;
                println!("  {}", "installing".dimmed());
            }
            StepPhase::Running => {
                self.printed_lines = 0;
            }
            StepPhase::Complete => {
                let note = last_note(state).unwrap_or("updated");
                println!("  {} {} {}", "✓".green(), step.name, note.green());
            }
            StepPhase::Failed => {
                let note = last_note(state).unwrap_or("failed");
                println!("  {} {} {}", "✗".red(), step.name, note.red());
                println!(
                    "  {}",
                    format!("see `upkeep log {}` for details", step.id).dimmed()
                );
            }
            StepPhase::Skipped => {
                println!("  {} {} {}", "–".dimmed(), step.name, "skipped".dimmed());
            }
            StepPhase::NotAvailable => {
                let note = last_note(state).unwrap_or("not installed");
                println!("  {} {} {}", "–".dimmed(), step.name, note.dimmed());
            }
            StepPhase::Pending => {}
        }
    }
}

fn last_note(state: &RunState) -> Option<&str> {
    state
        .completed
        .last()
        .and_then(|record| record.summary_note.as_deref())
}

// ── Step selection ──

fn known_step_ids() -> String {
    all_steps()
        .iter()
        .map(|step| step.id().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Explicit ids bypass the config; a bare run takes every enabled step.
fn select_steps(step_ids: &[String], config: &UpkeepConfig) -> Result<Vec<Arc<dyn Step>>> {
    if step_ids.is_empty() {
        return Ok(all_steps()
            .into_iter()
            .filter(|step| config.is_step_enabled(step.id()))
            .collect());
    }
    step_ids
        .iter()
        .map(|id| {
            step_by_id(id).ok_or_else(|| {
                Error::UnknownStep(format!("{id} (known steps: {})", known_step_ids())).into()
            })
        })
        .collect()
}

pub async fn run(step_ids: &[String], yes: bool) -> Result<()> {
    let config = read_config(&resolve_config_path());
    let steps = select_steps(step_ids, &config)?;
    debug!(count = steps.len(), "selected steps");

    let engine = UpdateEngine::new(
        Arc::new(ShellRunner::new()),
        Arc::new(FileLogFactory::default()),
    );

    // First Ctrl-C cancels whatever command is in flight; the next press,
    // or a press with nothing active, ends the process.
    let shell = engine.shell();
    tokio::spawn(async move {
        let mut canceled_once = false;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if canceled_once || !shell.cancel_active() {
                std::process::exit(130);
            }
            canceled_once = true;
            println!("\n{}", "canceling current command".yellow());
        }
    });

    let versions = SystemVersionCollector::new(engine.shell());
    let mut oracle = StdinOracle::new();
    let mut renderer = ConsoleRenderer::new();
    let options = EngineOptions {
        prompt_mode: if yes {
            PromptMode::AutoAccept
        } else {
            PromptMode::Interactive
        },
        ..Default::default()
    };

    let state = engine
        .run(&steps, options, &mut oracle, &versions, &mut |state| {
            renderer.render(state)
        })
        .await?;

    let failed = state
        .completed
        .iter()
        .filter(|record| record.phase == StepPhase::Failed)
        .count();
    if failed > 0 {
        println!("\n{}", format!("{failed} step(s) failed").red());
        std::process::exit(1);
    }
    Ok(())
}
