//! Status command - Display the state of a plan
//!
//! Provides the `namefix status` CLI command which:
//! 1. Shows overall progress (counts per status)
//! 2. Lists every conflict with severity, progress and eligibility
//! 3. Lists every rename operation, including recorded errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use namefix_core::{config::Config, domain::Status};
use namefix_orchestrator::Registry;
use tracing::info;

use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Plan file (YAML or JSON)
    pub plan: PathBuf,
}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let registry = super::load_registry(&self.plan, config)?;

        info!(
            conflicts = registry.conflict_count(),
            operations = registry.operation_count(),
            "Collected plan status"
        );

        if format == OutputFormat::Json {
            let snapshot = serde_json::to_value(registry.snapshot())
                .context("Failed to serialize registry snapshot")?;
            formatter.document(&snapshot);
            return Ok(());
        }

        show_progress(&registry, &*formatter);
        show_conflicts(&registry, &*formatter);
        show_operations(&registry, &*formatter);
        Ok(())
    }
}

fn show_progress(registry: &Registry, formatter: &dyn OutputFormatter) {
    let progress = registry.progress_report();
    formatter.success(&format!(
        "{}, {}",
        plural(progress.conflicts.total(), "conflict"),
        plural(progress.operations.total(), "rename operation")
    ));
    for (label, counts) in [
        ("Conflicts", progress.conflicts),
        ("Operations", progress.operations),
    ] {
        formatter.info(&format!(
            "{:<11} {:>3}% done  pending {}  in progress {}  completed {}  failed {}",
            label,
            counts.percent_complete(),
            counts.pending,
            counts.in_progress,
            counts.completed,
            counts.failed
        ));
    }
}

fn show_conflicts(registry: &Registry, formatter: &dyn OutputFormatter) {
    let summaries = registry.conflict_summaries();
    if summaries.is_empty() {
        return;
    }

    formatter.info("");
    formatter.info("Name                      Kind   Severity  Status       Progress  Ready");
    formatter.info("------------------------- ------ --------- ------------ --------- -----");
    for s in &summaries {
        formatter.info(&format!(
            "{:<25} {:<6} {:<9} {:<12} {:<9} {}",
            truncate(&s.name, 25),
            s.kind.to_string(),
            s.severity.to_string(),
            s.status.name(),
            s.progress,
            if s.can_resolve { "yes" } else { "no" }
        ));
    }
}

fn show_operations(registry: &Registry, formatter: &dyn OutputFormatter) {
    if registry.operation_count() == 0 {
        return;
    }

    formatter.info("");
    for op in registry.operations() {
        formatter.item(
            op.status(),
            &format!(
                "{} -> {} ({})",
                op.old_name(),
                op.new_name(),
                op.target_path().display()
            ),
        );
        if let (Status::Failed, Some(error)) = (op.status(), op.error()) {
            formatter.warn(&format!("{}: {}", op.old_name(), error));
        }
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let cut: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
