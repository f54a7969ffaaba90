//! Per-step log sinks.
//!
//! Every step run (and every install sub-phase) gets its own append-only log
//! file under the upkeep log directory, named `<scope>-<timestamp>.log`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::AsyncWriteExt;

/// An append-only sink for one step's output.
#[async_trait::async_trait]
pub trait StepLog: Send + Sync {
    async fn append(&self, line: &str) -> Result<()>;
}

/// Creates a fresh log sink scoped to a step id (or `<stepId>-install`).
#[async_trait::async_trait]
pub trait LogFactory: Send + Sync {
    async fn create(&self, scope: &str) -> Result<Arc<dyn StepLog>>;
}

/// Default location: `~/.upkeep/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".upkeep")
        .join("logs")
}

// ── File-backed implementation ──

pub struct FileLogFactory {
    dir: PathBuf,
}

impl FileLogFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for FileLogFactory {
    fn default() -> Self {
        Self::new(default_log_dir())
    }
}

#[async_trait::async_trait]
impl LogFactory for FileLogFactory {
    async fn create(&self, scope: &str) -> Result<Arc<dyn StepLog>> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create log directory {}", self.dir.display()))?;
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let path = self.dir.join(format!("{scope}-{timestamp}.log"));
        Ok(Arc::new(FileStepLog { path }))
    }
}

struct FileStepLog {
    path: PathBuf,
}

#[async_trait::async_trait]
impl StepLog for FileStepLog {
    async fn append(&self, line: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open log file {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

// ── In-memory implementation (tests and dry runs) ──

/// Collects log lines per scope in memory instead of touching the filesystem.
#[derive(Default, Clone)]
pub struct MemoryLogFactory {
    logs: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl MemoryLogFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines appended under a scope so far, in order.
    pub fn lines(&self, scope: &str) -> Vec<String> {
        self.logs
            .lock()
            .expect("log map poisoned")
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Scopes a sink was created for.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .logs
            .lock()
            .expect("log map poisoned")
            .keys()
            .cloned()
            .collect();
        scopes.sort();
        scopes
    }
}

#[async_trait::async_trait]
impl LogFactory for MemoryLogFactory {
    async fn create(&self, scope: &str) -> Result<Arc<dyn StepLog>> {
        self.logs
            .lock()
            .expect("log map poisoned")
            .entry(scope.to_string())
            .or_default();
        Ok(Arc::new(MemoryStepLog {
            scope: scope.to_string(),
            logs: self.logs.clone(),
        }))
    }
}

struct MemoryStepLog {
    scope: String,
    logs: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

#[async_trait::async_trait]
impl StepLog for MemoryStepLog {
    async fn append(&self, line: &str) -> Result<()> {
        self.logs
            .lock()
            .expect("log map poisoned")
            .entry(self.scope.clone())
            .or_default()
            .push(line.to_string());
        Ok(())
    }
}

// ── Log discovery (consumed by the `log` CLI command) ──

/// Newest log file for a step, by the lexically sortable timestamp suffix.
pub fn find_latest_log_for_step(dir: &Path, step_id: &str) -> Option<PathBuf> {
    let prefix = format!("{step_id}-");
    let mut matches: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".log"))
        .collect();
    matches.sort();
    matches.pop().map(|name| dir.join(name))
}

/// Sorted, deduplicated scopes that have at least one log file.
pub fn list_step_ids_with_logs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            let stem = name.strip_suffix(".log")?;
            let (scope, _timestamp) = stem.rsplit_once('-')?;
            Some(scope.to_string())
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
