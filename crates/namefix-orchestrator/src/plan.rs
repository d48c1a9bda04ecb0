//! Plan files - the inbound description of conflicts and renames
//!
//! A plan lists conflict records and rename operations together with their
//! dependency edges. It can be written in YAML or JSON:
//!
//! ```yaml
//! conflicts:
//!   - name: Logger
//!     kind: class
//!     locations: [src/a/logger.ts, src/b/logger.ts]
//!     severity: high
//!     strategy: suffix with package
//!     replacement_names: [ALogger, BLogger]
//! operations:
//!   - kind: file
//!     old_name: logger.ts
//!     new_name: a-logger.ts
//!     target_path: src/a/logger.ts
//!     depends_on: []
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use namefix_core::{
    domain::{
        ConflictKey, ConflictRecord, NameKind, OperationKey, RenameOperation, Severity, Status,
        TransitionTable,
    },
    ports::clock::SharedClock,
};

use crate::{error::OrchestratorError, registry::Registry};

/// A conflict entry in a plan file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub name: String,
    pub kind: NameKind,
    #[serde(default)]
    pub locations: Vec<PathBuf>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default)]
    pub replacement_names: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A rename operation entry in a plan file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    pub kind: NameKind,
    pub old_name: String,
    pub new_name: String,
    pub target_path: PathBuf,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

fn default_severity() -> Severity {
    Severity::Medium
}

/// Everything the orchestrator needs to know about one restructuring run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub conflicts: Vec<ConflictEntry>,
    pub operations: Vec<OperationEntry>,
}

impl Plan {
    /// Loads a plan from disk; `.json` files are parsed as JSON, anything
    /// else as YAML
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let plan = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };
        plan.with_context(|| format!("failed to parse plan file {}", path.display()))
    }

    /// Writes the plan to disk in the format implied by the extension
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let content = if is_json {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        std::fs::write(path, content)
            .with_context(|| format!("failed to write plan file {}", path.display()))
    }

    /// Captures the current contents and statuses of a registry
    pub fn from_registry(registry: &Registry) -> Self {
        let conflicts = registry
            .conflicts()
            .map(|c| ConflictEntry {
                name: c.name().to_string(),
                kind: c.kind(),
                locations: c.locations().to_vec(),
                severity: c.severity(),
                strategy: c.strategy().map(str::to_string),
                replacement_names: c.replacement_names().to_vec(),
                depends_on: c.dependencies().iter().map(ToString::to_string).collect(),
                status: c.status(),
                created_at: Some(c.created_at()),
                updated_at: Some(c.updated_at()),
            })
            .collect();
        let operations = registry
            .operations()
            .map(|o| OperationEntry {
                kind: o.kind(),
                old_name: o.old_name().to_string(),
                new_name: o.new_name().to_string(),
                target_path: o.target_path().to_path_buf(),
                depends_on: o.dependencies().iter().map(ToString::to_string).collect(),
                status: o.status(),
                error: o.error().map(str::to_string),
                created_at: Some(o.created_at()),
                executed_at: o.executed_at(),
            })
            .collect();
        Self {
            conflicts,
            operations,
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, OrchestratorError> {
        serde_yaml::from_str(content).map_err(|e| OrchestratorError::InvalidPlan(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, OrchestratorError> {
        serde_json::from_str(content).map_err(|e| OrchestratorError::InvalidPlan(e.to_string()))
    }

    /// Builds a registry holding every entry of the plan
    ///
    /// Entries may depend on ones listed later in the file. Recorded
    /// statuses, errors and timestamps are restored as stored state, not
    /// replayed through the transition table.
    ///
    /// # Errors
    ///
    /// Fails on invalid keys, duplicates, self dependencies and cycles.
    pub fn into_registry(
        self,
        transitions: TransitionTable,
        clock: SharedClock,
    ) -> Result<Registry, OrchestratorError> {
        let mut registry = Registry::with_settings(transitions, clock.clone());

        // Edges go on the records before registration, so restored
        // timestamps are not touched and cycles are still rejected
        for entry in self.conflicts {
            let mut record = ConflictRecord::with_clock(
                ConflictKey::new(entry.name)?,
                entry.kind,
                entry.locations,
                entry.severity,
                clock.clone(),
            );
            if let Some(strategy) = entry.strategy {
                record.set_strategy(strategy);
            }
            if !entry.replacement_names.is_empty() {
                record.set_replacement_names(entry.replacement_names);
            }
            for dep in entry.depends_on {
                record.add_dependency(ConflictKey::new(dep)?)?;
            }
            record.restore(entry.status, entry.created_at, entry.updated_at);
            registry.register_conflict(record)?;
        }

        for entry in self.operations {
            let mut operation = RenameOperation::with_clock(
                entry.kind,
                OperationKey::new(entry.old_name)?,
                entry.new_name,
                entry.target_path,
                clock.clone(),
            )?;
            for dep in entry.depends_on {
                operation.add_dependency(OperationKey::new(dep)?)?;
            }
            let error = match entry.error {
                None if entry.status == Status::Failed => Some("failed".to_string()),
                error => error,
            };
            operation.restore(entry.status, error, entry.created_at, entry.executed_at);
            registry.register_operation(operation)?;
        }

        Ok(registry)
    }
}
