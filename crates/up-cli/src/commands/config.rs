//! `upkeep config`: show or edit which steps run.

use anyhow::Result;
use colored::Colorize;

use up_core::Error;
use up_engine::steps::{all_steps, step_by_id};

use crate::config::{read_config, resolve_config_path, write_config};

fn known_step_ids() -> String {
    all_steps()
        .iter()
        .map(|step| step.id().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn set_enabled(step_id: &str, enabled: bool) -> Result<()> {
    if step_by_id(step_id).is_none() {
        return Err(Error::UnknownStep(format!(
            "{step_id} (known steps: {})",
            known_step_ids()
        ))
        .into());
    }
    let path = resolve_config_path();
    let mut config = read_config(&path);
    config.set_step_enabled(step_id, enabled)?;
    write_config(&path, &config)?;
    println!(
        "{} {}",
        step_id,
        if enabled { "enabled".green() } else { "disabled".dimmed() }
    );
    Ok(())
}

pub fn run(enable: Option<&str>, disable: Option<&str>) -> Result<()> {
    if let Some(step_id) = enable {
        return set_enabled(step_id, true);
    }
    if let Some(step_id) = disable {
        return set_enabled(step_id, false);
    }

    let path = resolve_config_path();
    let config = read_config(&path);
    println!("{}", path.display().to_string().dimmed());
    for step in all_steps() {
        let marker = if config.is_step_enabled(step.id()) {
            "on ".green()
        } else {
            "off".dimmed()
        };
        println!("  {marker}  {:<10} {}", step.id(), step.description().dimmed());
    }
    Ok(())
}
