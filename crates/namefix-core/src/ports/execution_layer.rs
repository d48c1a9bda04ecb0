//! Execution layer port (driven/secondary port)
//!
//! The core never touches source files. Once the orchestrator decides an
//! item is eligible, it hands a copy of the item to this port, which
//! performs the actual rename (or whatever the conflict's strategy calls
//! for) and reports success or failure back.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because failures are adapter-specific; the
//!   orchestrator records the error text with `mark_failed`.
//! - Implementations receive owned snapshots of the entities, never the
//!   registry itself, so they cannot mutate statuses behind the
//!   orchestrator's back.
//! - Calls may be retried and may be cancelled by a timeout, so they should
//!   be safe to repeat.

use crate::domain::{ConflictRecord, RenameOperation};

/// Port trait for the layer that applies renames
#[async_trait::async_trait]
pub trait IExecutionLayer: Send + Sync {
    /// Applies a single rename operation
    ///
    /// # Arguments
    /// * `operation` - The eligible operation; its dependencies are all completed
    async fn apply_rename(&self, operation: &RenameOperation) -> anyhow::Result<()>;

    /// Finalizes a conflict whose dependencies are all resolved
    ///
    /// # Arguments
    /// * `conflict` - The eligible conflict, with strategy and replacement names
    async fn resolve_conflict(&self, conflict: &ConflictRecord) -> anyhow::Result<()>;
}
