//! Error types for the orchestrator

use namefix_core::domain::DomainError;
use thiserror::Error;

/// Errors raised while building or driving the dependency graph
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No conflict record is registered under this name
    #[error("conflict not found: {0}")]
    UnknownConflict(String),

    /// No rename operation is registered under this old name
    #[error("operation not found: {0}")]
    UnknownOperation(String),

    /// A second entity was registered under an existing key
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Adding the edge would close a dependency cycle
    #[error("dependency cycle: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// Pending items remain but none can ever become eligible
    ///
    /// Raised for cycles that slipped past insertion checks and for
    /// dependencies on keys that were never registered.
    #[error("unresolvable dependency graph, stuck items: {}", pending.join(", "))]
    Unresolvable { pending: Vec<String> },

    /// Invalid plan file
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Domain rule violated
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Worker task could not be joined
    #[error("execution task failed: {0}")]
    Task(String),
}
