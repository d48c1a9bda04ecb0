//! Run command - Execute a plan in dependency order
//!
//! Provides the `namefix run` CLI command which:
//! 1. Loads the plan and builds the registry
//! 2. Drives every operation, then every conflict, through the dry-run
//!    execution layer
//! 3. Prints the run report and optionally saves the resulting statuses

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use namefix_core::config::Config;
use namefix_orchestrator::{Orchestrator, OrchestratorSettings, Plan, RunReport, StageReport};
use tracing::info;

use crate::{
    executor::DryRunExecutor,
    output::{get_formatter, plural, OutputFormat, OutputFormatter},
};

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Plan file (YAML or JSON)
    pub plan: PathBuf,

    /// Override the number of items executed concurrently
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Write the plan with updated statuses to this file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let registry = super::load_registry(&self.plan, config)?;

        let mut settings = OrchestratorSettings::from(&config.orchestrator);
        if let Some(n) = self.max_concurrent {
            anyhow::ensure!(n > 0, "--max-concurrent must be greater than 0");
            settings.max_concurrent = n;
        }

        let executor = Arc::new(DryRunExecutor::new());
        let mut orchestrator = Orchestrator::new(registry, executor.clone(), settings);
        let outcome = orchestrator.run().await;

        // Statuses reached before a stall are still worth keeping
        if let Some(path) = &self.save {
            Plan::from_registry(orchestrator.registry())
                .save(path)
                .with_context(|| format!("Failed to save state to {}", path.display()))?;
            info!(path = %path.display(), "Saved plan state");
        }

        let report = outcome.context("Run stopped")?;
        let (renames, resolutions) = executor.counts();
        info!(renames, resolutions, "Dry run finished");

        if format == OutputFormat::Json {
            let value = serde_json::to_value(&report).context("Failed to serialize report")?;
            formatter.document(&serde_json::json!({
                "success": report.is_success(),
                "report": value,
            }));
        } else {
            print_report(&report, &*formatter);
        }

        if !report.is_success() {
            anyhow::bail!(
                "run finished with {} failed and {} blocked items",
                report.operations.failed.len() + report.conflicts.failed.len(),
                report.operations.blocked.len() + report.conflicts.blocked.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &RunReport, formatter: &dyn OutputFormatter) {
    print_stage("Operations", "operation", &report.operations, formatter);
    print_stage("Conflicts", "conflict", &report.conflicts, formatter);
}

fn print_stage(title: &str, noun: &str, stage: &StageReport, formatter: &dyn OutputFormatter) {
    formatter.success(&format!(
        "{title}: {} completed in {}",
        plural(stage.completed.len(), noun),
        plural(stage.waves, "wave")
    ));
    for item in &stage.failed {
        let attempts = stage.attempts.get(&item.key).copied().unwrap_or_default();
        formatter.error(&format!(
            "{} failed after {}: {}",
            item.key,
            plural(attempts as usize, "attempt"),
            item.error
        ));
    }
    if !stage.blocked.is_empty() {
        formatter.warn(&format!(
            "blocked by failed dependencies: {}",
            stage.blocked.join(", ")
        ));
    }
}
