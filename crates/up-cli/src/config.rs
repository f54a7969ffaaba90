//! Step enable/disable configuration.
//!
//! TOML file with a `[steps]` table of `id = bool`. Opt-out model: a step
//! absent from the table is enabled. Read errors fall back to the empty
//! config rather than failing the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use up_core::{Error, Result};

/// Steps that cannot be disabled; brew is a hard runtime dependency.
pub const PROTECTED_STEP_IDS: &[&str] = &["homebrew"];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpkeepConfig {
    #[serde(default)]
    pub steps: BTreeMap<String, bool>,
}

impl UpkeepConfig {
    pub fn is_step_enabled(&self, step_id: &str) -> bool {
        if PROTECTED_STEP_IDS.contains(&step_id) {
            return true;
        }
        self.steps.get(step_id).copied().unwrap_or(true)
    }

    pub fn set_step_enabled(&mut self, step_id: &str, enabled: bool) -> Result<()> {
        if !enabled && PROTECTED_STEP_IDS.contains(&step_id) {
            return Err(Error::ProtectedStep(step_id.to_string()));
        }
        self.steps.insert(step_id.to_string(), enabled);
        Ok(())
    }
}

/// Prefer `~/.config/upkeep/config` when `~/.config` exists, otherwise
/// `~/.upkeep/config`.
pub fn resolve_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let xdg_config = home.join(".config");
    if xdg_config.exists() {
        xdg_config.join("upkeep").join("config")
    } else {
        home.join(".upkeep").join("config")
    }
}

pub fn read_config(path: &Path) -> UpkeepConfig {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return UpkeepConfig::default();
    };
    toml::from_str(&raw).unwrap_or_default()
}

pub fn write_config(path: &Path, config: &UpkeepConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = toml::to_string_pretty(config)
        .map_err(|error| Error::Config(format!("failed to serialize config: {error}")))?;
    std::fs::write(path, raw)?;
    Ok(())
}
