//! upkeep: a sequential, interactive maintenance runner for macOS
//! development machines.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "upkeep", version, about = "Keep a macOS dev machine up to date")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Answer yes to every prompt.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run maintenance steps (the default). Pass step ids to run a subset.
    Update {
        /// Specific steps to run, in catalog order when omitted.
        steps: Vec<String>,
    },
    /// Show the latest log for a step, or list steps that have logs.
    Log {
        /// Step id to show the latest log for.
        step: Option<String>,
        /// List step ids that have logs instead.
        #[arg(long)]
        list: bool,
    },
    /// Show or edit which steps are enabled.
    Config {
        /// Enable a step.
        #[arg(long, value_name = "STEP")]
        enable: Option<String>,
        /// Disable a step.
        #[arg(long, value_name = "STEP", conflicts_with = "enable")]
        disable: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("up_runner=warn,up_engine=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        None => commands::update::run(&[], cli.yes).await,
        Some(Commands::Update { steps }) => commands::update::run(&steps, cli.yes).await,
        Some(Commands::Log { step, list }) => commands::log::run(step.as_deref(), list),
        Some(Commands::Config { enable, disable }) => {
            commands::config::run(enable.as_deref(), disable.as_deref())
        }
    }
}
