//! Next command - List items that can run right now

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use namefix_core::{config::Config, domain::Status};

use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Args)]
pub struct NextCommand {
    /// Plan file (YAML or JSON)
    pub plan: PathBuf,
}

impl NextCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let registry = super::load_registry(&self.plan, config)?;

        let operations: Vec<String> = registry
            .next_executable()
            .iter()
            .map(ToString::to_string)
            .collect();
        let conflicts: Vec<String> = registry
            .next_resolvable()
            .iter()
            .map(ToString::to_string)
            .collect();

        if format == OutputFormat::Json {
            formatter.document(&serde_json::json!({
                "operations": operations,
                "conflicts": conflicts,
            }));
            return Ok(());
        }

        if operations.is_empty() && conflicts.is_empty() {
            formatter.success("Nothing is eligible to run");
            return Ok(());
        }

        formatter.success(&format!(
            "{} and {} ready",
            plural(operations.len(), "operation"),
            plural(conflicts.len(), "conflict")
        ));
        for key in &operations {
            formatter.item(Status::Pending, &format!("rename   {key}"));
        }
        for key in &conflicts {
            formatter.item(Status::Pending, &format!("resolve  {key}"));
        }
        Ok(())
    }
}
