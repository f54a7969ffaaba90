//! Shell command supervision: spawn, stream, cancel.
//!
//! `ShellRunner` owns the single-slot "currently active command" state. At
//! most one streamed command is in flight at any moment (the engine
//! sequences them), which is what makes the single `cancel_active` handle
//! sound.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Notify;

use up_core::{OutputLine, OutputSource};

use crate::lines::LineSplitter;
use crate::logger::StepLog;

/// Trailing lines of each stream reproduced in the failure summary.
const TAIL_LINES: usize = 20;

/// Prefix for lines the supervisor itself writes to a step log.
const LOG_PREFIX: &str = "[upkeep]";

/// Diagnostic payload for a command that exited non-zero or was signaled.
/// Output was already streamed line-by-line; the full captures are kept so
/// the failure summary can reproduce the stream tails.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub command: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub short_message: String,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short_message)
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The user canceled the command while it was running. Distinguished
    /// from `CommandFailed` so the engine can reset auto-accept mode.
    #[error("canceled by user: {command}")]
    Canceled { command: String },

    #[error("{0}")]
    CommandFailed(CommandFailure),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Default)]
struct CancelState {
    requested: AtomicBool,
    notify: Notify,
}

impl CancelState {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Launches shell commands and supervises the one currently in flight.
#[derive(Default)]
pub struct ShellRunner {
    active: Mutex<Option<Arc<CancelState>>>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn bash(command: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command).stdin(Stdio::null());
        cmd
    }

    /// Request cancellation of the in-flight command, if any. Signals the
    /// child process and marks the command as user-canceled, so its
    /// `run_streaming` call resolves with [`RunnerError::Canceled`]. Returns
    /// `false` when nothing is active.
    pub fn cancel_active(&self) -> bool {
        let slot = self.active.lock().expect("active command slot poisoned");
        match slot.as_ref() {
            Some(cancel) => {
                cancel.request();
                true
            }
            None => false,
        }
    }

    /// Run `command` through `bash -c`, streaming every complete output line
    /// to `on_line` (tagged with its source stream) and to the step log, in
    /// arrival order. Blocks until the process exits.
    ///
    /// On failure the full accumulated output is kept and a structured
    /// summary is appended to the log before the error is returned, so the
    /// log carries the diagnostic even if the caller drops the error.
    pub async fn run_streaming<F>(
        &self,
        command: &str,
        mut on_line: F,
        log: &dyn StepLog,
    ) -> Result<(), RunnerError>
    where
        F: FnMut(OutputLine) + Send,
    {
        let cancel = Arc::new(CancelState::default());
        {
            let mut slot = self.active.lock().expect("active command slot poisoned");
            debug_assert!(slot.is_none(), "commands must be strictly sequenced");
            *slot = Some(cancel.clone());
        }
        let result = self.stream_child(command, &mut on_line, log, &cancel).await;
        *self.active.lock().expect("active command slot poisoned") = None;
        result
    }

    async fn stream_child<F>(
        &self,
        command: &str,
        on_line: &mut F,
        log: &dyn StepLog,
        cancel: &CancelState,
    ) -> Result<(), RunnerError>
    where
        F: FnMut(OutputLine) + Send,
    {
        let mut child = Self::bash(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(RunnerError::Spawn {
                command: command.to_string(),
                source: std::io::Error::other("child stdio was not piped"),
            });
        };

        let mut stdout_split = LineSplitter::new();
        let mut stderr_split = LineSplitter::new();
        let mut stdout_capture: Vec<String> = Vec::new();
        let mut stderr_capture: Vec<String> = Vec::new();
        let mut stdout_buf = [0u8; 4096];
        let mut stderr_buf = [0u8; 4096];
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut kill_sent = false;

        while stdout_open || stderr_open {
            tokio::select! {
                read = stdout.read(&mut stdout_buf), if stdout_open => match read {
                    Ok(n) if n > 0 => {
                        for line in stdout_split.push(&stdout_buf[..n]) {
                            deliver(line, OutputSource::Stdout, on_line, log, &mut stdout_capture)
                                .await;
                        }
                    }
                    _ => {
                        stdout_open = false;
                        if let Some(line) = stdout_split.finish() {
                            deliver(line, OutputSource::Stdout, on_line, log, &mut stdout_capture)
                                .await;
                        }
                    }
                },
                read = stderr.read(&mut stderr_buf), if stderr_open => match read {
                    Ok(n) if n > 0 => {
                        for line in stderr_split.push(&stderr_buf[..n]) {
                            deliver(line, OutputSource::Stderr, on_line, log, &mut stderr_capture)
                                .await;
                        }
                    }
                    _ => {
                        stderr_open = false;
                        if let Some(line) = stderr_split.finish() {
                            deliver(line, OutputSource::Stderr, on_line, log, &mut stderr_capture)
                                .await;
                        }
                    }
                },
                _ = cancel.notify.notified(), if !kill_sent => {
                    kill_sent = true;
                    tracing::info!(%command, "cancellation requested, signaling child");
                    if let Err(error) = child.start_kill() {
                        tracing::warn!(%command, %error, "failed to signal child process");
                    }
                }
            }
        }

        // Streams can hit EOF while the child still runs (stdio closed or
        // redirected), so cancellation must stay observable until exit. A
        // request landing between loop exit and this wait is covered by the
        // permit `Notify` stores.
        let status = loop {
            tokio::select! {
                result = child.wait() => break result.map_err(|source| RunnerError::Wait {
                    command: command.to_string(),
                    source,
                })?,
                _ = cancel.notify.notified(), if !kill_sent => {
                    kill_sent = true;
                    tracing::info!(%command, "cancellation requested, signaling child");
                    if let Err(error) = child.start_kill() {
                        tracing::warn!(%command, %error, "failed to signal child process");
                    }
                }
            }
        };

        if status.success() {
            return Ok(());
        }

        let exit_code = status.code();
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal: Option<i32> = None;

        let short_message = match (exit_code, signal) {
            (Some(code), _) => format!("Command failed with exit code {code}: {command}"),
            (None, Some(sig)) => format!("Command was killed with signal {sig}: {command}"),
            (None, None) => format!("Command failed: {command}"),
        };

        let failure = CommandFailure {
            command: command.to_string(),
            exit_code,
            signal,
            short_message,
            stdout: stdout_capture.join("\n"),
            stderr: stderr_capture.join("\n"),
        };

        // The log must carry the diagnostic before the error propagates.
        append_failure_summary(&failure, log).await;

        if cancel.requested() {
            append_or_warn(log, &format!("{LOG_PREFIX} Command canceled by user")).await;
            return Err(RunnerError::Canceled {
                command: command.to_string(),
            });
        }

        Err(RunnerError::CommandFailed(failure))
    }

    /// Run a command to completion, discarding output. True iff it exited 0.
    pub async fn succeeds(&self, command: &str) -> bool {
        match Self::bash(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }

    /// Capture a command's stdout, trimmed. Any failure (spawn error or
    /// non-zero exit) yields the empty string rather than an error.
    pub async fn capture_trimmed(&self, command: &str) -> String {
        match Self::bash(command).output().await {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => String::new(),
        }
    }
}

async fn deliver<F>(
    text: String,
    source: OutputSource,
    on_line: &mut F,
    log: &dyn StepLog,
    capture: &mut Vec<String>,
) where
    F: FnMut(OutputLine) + Send,
{
    if text.is_empty() {
        return;
    }
    capture.push(text.clone());
    on_line(OutputLine {
        text: text.clone(),
        source,
    });
    append_or_warn(log, &text).await;
}

async fn append_or_warn(log: &dyn StepLog, line: &str) {
    if let Err(error) = log.append(line).await {
        tracing::warn!(%error, "failed to append to step log");
    }
}

async fn append_failure_summary(failure: &CommandFailure, log: &dyn StepLog) {
    append_or_warn(
        log,
        &format!("{LOG_PREFIX} Command failed: {}", failure.command),
    )
    .await;
    if let Some(code) = failure.exit_code {
        append_or_warn(log, &format!("{LOG_PREFIX} Exit code: {code}")).await;
    }
    if let Some(sig) = failure.signal {
        append_or_warn(log, &format!("{LOG_PREFIX} Signal: {sig}")).await;
    }
    append_or_warn(log, &format!("{LOG_PREFIX} {}", failure.short_message)).await;
    for (label, text) in [("stderr", &failure.stderr), ("stdout", &failure.stdout)] {
        let tail = tail_lines(text, TAIL_LINES);
        if tail.is_empty() {
            continue;
        }
        append_or_warn(log, &format!("{LOG_PREFIX} {label} tail ({}):", tail.len())).await;
        for line in tail {
            append_or_warn(log, &format!("  {line}")).await;
        }
    }
}

fn tail_lines(text: &str, cap: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(cap);
    lines[start..].to_vec()
}
