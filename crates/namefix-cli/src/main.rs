//! namefix CLI - Command-line interface for namefix
//!
//! Provides commands for:
//! - Viewing the status of every conflict and rename in a plan
//! - Listing what can run next
//! - Checking a plan's dependency graph
//! - Running a plan in dependency order

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use namefix_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod executor;
mod output;

use commands::{check::CheckCommand, next::NextCommand, run::RunCommand, status::StatusCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "namefix",
    version,
    about = "Resolve duplicate class and file names in dependency order"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the status of every conflict and rename operation
    Status(StatusCommand),
    /// List the items that are eligible right now
    Next(NextCommand),
    /// Check the dependency graph for missing keys and dead ends
    Check(CheckCommand),
    /// Execute the plan in dependency order
    Run(RunCommand),
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Status(cmd) => cmd.execute(&config, format).await,
        Commands::Next(cmd) => cmd.execute(&config, format).await,
        Commands::Check(cmd) => cmd.execute(&config, format).await,
        Commands::Run(cmd) => cmd.execute(&config, format).await,
    }
}
