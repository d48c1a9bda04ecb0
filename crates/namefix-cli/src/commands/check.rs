//! Check command - Validate a plan's dependency graphs
//!
//! Loading the plan already rejects duplicates and cycles. This command
//! additionally reports dependencies on keys the plan never defines and
//! items that can never run, and exits non-zero if any exist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use namefix_core::config::Config;
use namefix_orchestrator::registry::GraphCheck;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Plan file (YAML or JSON)
    pub plan: PathBuf,
}

impl CheckCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let registry = super::load_registry(&self.plan, config)?;
        let check = registry.check_graph();

        if format == OutputFormat::Json {
            let value = serde_json::to_value(&check).context("Failed to serialize check")?;
            formatter.document(&serde_json::json!({
                "resolvable": check.is_resolvable(),
                "check": value,
            }));
        } else {
            report(&check, &*formatter);
        }

        if !check.is_resolvable() {
            anyhow::bail!(
                "{} cannot finish: {} stuck conflicts, {} stuck operations",
                self.plan.display(),
                check.stuck_conflicts.len(),
                check.stuck_operations.len()
            );
        }
        Ok(())
    }
}

fn report(check: &GraphCheck, formatter: &dyn OutputFormatter) {
    for (dependent, missing) in &check.missing_conflict_dependencies {
        formatter.warn(&format!("conflict {dependent} depends on unknown conflict {missing}"));
    }
    for (dependent, missing) in &check.missing_operation_dependencies {
        formatter.warn(&format!(
            "operation {dependent} depends on unknown operation {missing}"
        ));
    }
    if !check.blocked_conflicts.is_empty() || !check.blocked_operations.is_empty() {
        formatter.warn(&format!(
            "blocked by failures: {}",
            check
                .blocked_operations
                .iter()
                .chain(&check.blocked_conflicts)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if check.is_resolvable() {
        formatter.success("Dependency graph can be completed");
    } else {
        for key in &check.stuck_conflicts {
            formatter.error(&format!("conflict {key} can never be resolved"));
        }
        for key in &check.stuck_operations {
            formatter.error(&format!("operation {key} can never execute"));
        }
    }
}
