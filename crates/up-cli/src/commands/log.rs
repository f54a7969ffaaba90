//! `upkeep log`: inspect the per-step log files left behind by previous runs.

use anyhow::Result;
use colored::Colorize;

use up_core::Error;
use up_runner::{default_log_dir, find_latest_log_for_step, list_step_ids_with_logs};

pub fn run(step: Option<&str>, list: bool) -> Result<()> {
    let dir = default_log_dir();

    let Some(step_id) = step.filter(|_| !list) else {
        let ids = list_step_ids_with_logs(&dir);
        if ids.is_empty() {
            println!("{}", "no logs yet; run `upkeep` first".dimmed());
            return Ok(());
        }
        for id in ids {
            println!("{id}");
        }
        return Ok(());
    };

    let Some(path) = find_latest_log_for_step(&dir, step_id) else {
        return Err(Error::NoLogsForStep(step_id.to_string()).into());
    };

    println!("{}", path.display().to_string().dimmed());
    let contents = std::fs::read_to_string(&path)?;
    print!("{contents}");
    Ok(())
}
