//! Dry-run execution layer
//!
//! namefix does not touch source files itself. This adapter stands in for
//! the layer that would: it logs every rename and conflict fix it is handed
//! and reports success, so a plan can be walked end to end.

use std::sync::atomic::{AtomicUsize, Ordering};

use namefix_core::{
    domain::{ConflictRecord, RenameOperation},
    ports::IExecutionLayer,
};
use tracing::info;

#[derive(Debug, Default)]
pub struct DryRunExecutor {
    renames: AtomicUsize,
    resolutions: AtomicUsize,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renames and conflict resolutions seen so far
    pub fn counts(&self) -> (usize, usize) {
        (
            self.renames.load(Ordering::Relaxed),
            self.resolutions.load(Ordering::Relaxed),
        )
    }
}

#[async_trait::async_trait]
impl IExecutionLayer for DryRunExecutor {
    async fn apply_rename(&self, operation: &RenameOperation) -> anyhow::Result<()> {
        self.renames.fetch_add(1, Ordering::Relaxed);
        info!(
            kind = %operation.kind(),
            from = %operation.old_name(),
            to = %operation.new_name(),
            path = %operation.target_path().display(),
            "[dry-run] rename"
        );
        Ok(())
    }

    async fn resolve_conflict(&self, conflict: &ConflictRecord) -> anyhow::Result<()> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        info!(
            conflict = %conflict.name(),
            strategy = conflict.strategy().unwrap_or("none"),
            replacements = %conflict.replacement_names().join(", "),
            "[dry-run] resolve conflict"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namefix_core::domain::{ConflictKey, NameKind, OperationKey, Severity};

    #[tokio::test]
    async fn test_dry_run_counts_calls() {
        let executor = DryRunExecutor::new();
        let op = RenameOperation::new(
            NameKind::File,
            OperationKey::new("a.ts").unwrap(),
            "b.ts",
            "src/a.ts",
        )
        .unwrap();
        let conflict = ConflictRecord::new(
            ConflictKey::new("A").unwrap(),
            NameKind::Class,
            vec![],
            Severity::Low,
        );

        executor.apply_rename(&op).await.unwrap();
        executor.apply_rename(&op).await.unwrap();
        executor.resolve_conflict(&conflict).await.unwrap();

        assert_eq!(executor.counts(), (2, 1));
    }
}
