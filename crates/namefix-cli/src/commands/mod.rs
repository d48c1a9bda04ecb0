pub mod check;
pub mod next;
pub mod run;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use namefix_core::{config::Config, ports::system_clock};
use namefix_orchestrator::{Plan, Registry};
use tracing::debug;

/// Loads a plan file and builds the registry with the configured transitions
pub(crate) fn load_registry(plan: &Path, config: &Config) -> Result<Registry> {
    let registry = Plan::load(plan)?
        .into_registry(config.orchestrator.transition_table(), system_clock())
        .with_context(|| format!("Invalid plan {}", plan.display()))?;
    debug!(
        plan = %plan.display(),
        conflicts = registry.conflict_count(),
        operations = registry.operation_count(),
        "Loaded plan"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_registry_applies_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(
            &path,
            "conflicts:\n  - { name: A, kind: file, locations: [a.ts] }\n",
        )
        .unwrap();

        let config = namefix_core::config::ConfigBuilder::new()
            .transitions(namefix_core::domain::TransitionMode::Strict)
            .build();
        let registry = load_registry(&path, &config).unwrap();
        assert_eq!(registry.conflict_count(), 1);
        assert_eq!(
            registry.transitions(),
            &namefix_core::domain::TransitionTable::strict()
        );
    }

    #[test]
    fn test_load_registry_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_registry(&dir.path().join("nope.yaml"), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
