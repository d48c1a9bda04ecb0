//! RenameOperation domain entity
//!
//! A rename operation applies one new name to one file or class. Operations
//! are keyed by their old name and may depend on other operations that must
//! complete first (for example renaming a base class before its subclasses).
//!
//! `mark_started` is only called by the orchestrator, so that an operation
//! being executed is distinguishable from one still waiting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::lookup::EntityLookup;
use super::newtypes::{NameKind, OperationKey};
use super::status::{Status, TransitionTable};
use crate::ports::clock::{system_clock, SharedClock};

/// Serializable snapshot of an operation
///
/// Dependencies are reported as a count only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub kind: NameKind,
    pub old_name: String,
    pub new_name: String,
    pub target_path: PathBuf,
    pub status: Status,
    pub error: Option<String>,
    pub can_execute: bool,
    pub dependency_count: usize,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// A single rename action on a file or class identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameOperation {
    kind: NameKind,
    /// Name being replaced, also the operation's key
    old_name: OperationKey,
    new_name: String,
    /// File the rename applies to
    target_path: PathBuf,
    /// Keys of operations that must complete first (append-only, deduplicated)
    dependencies: Vec<OperationKey>,
    status: Status,
    /// Failure detail, set only when marked failed
    error: Option<String>,
    created_at: DateTime<Utc>,
    /// Set when the operation completes or fails
    executed_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "system_clock")]
    clock: SharedClock,
}

impl RenameOperation {
    /// Creates a new pending operation stamped with the system clock
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if `new_name` is empty or
    /// identical to the old name.
    pub fn new(
        kind: NameKind,
        old_name: OperationKey,
        new_name: impl Into<String>,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        Self::with_clock(kind, old_name, new_name, target_path, system_clock())
    }

    /// Creates a new pending operation that reads time from `clock`
    pub fn with_clock(
        kind: NameKind,
        old_name: OperationKey,
        new_name: impl Into<String>,
        target_path: impl Into<PathBuf>,
        clock: SharedClock,
    ) -> Result<Self, DomainError> {
        let new_name = new_name.into();
        if new_name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "new name for '{old_name}' must not be empty"
            )));
        }
        if new_name == old_name.as_str() {
            return Err(DomainError::ValidationFailed(format!(
                "new name for '{old_name}' is identical to the old name"
            )));
        }

        Ok(Self {
            kind,
            old_name,
            new_name,
            target_path: target_path.into(),
            dependencies: Vec::new(),
            status: Status::Pending,
            error: None,
            created_at: clock.now(),
            executed_at: None,
            clock,
        })
    }

    // --- Getters ---

    /// Returns the operation's key (its old name)
    pub fn key(&self) -> &OperationKey {
        &self.old_name
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn old_name(&self) -> &str {
        self.old_name.as_str()
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn dependencies(&self) -> &[OperationKey] {
        &self.dependencies
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Returns true if `key` is a direct dependency
    pub fn depends_on(&self, key: &OperationKey) -> bool {
        self.dependencies.contains(key)
    }

    // --- Transitions ---

    /// Marks the operation as picked up for execution
    pub fn mark_started(&mut self) {
        self.status = Status::InProgress;
    }

    /// Marks the operation completed and stamps `executed_at`
    ///
    /// Unconditional. A previously recorded error is kept.
    pub fn mark_completed(&mut self) {
        self.status = Status::Completed;
        self.executed_at = Some(self.clock.now());
    }

    /// Marks the operation failed, records `error` and stamps `executed_at`
    ///
    /// Unconditional. Dependents are not touched; they simply never become
    /// executable.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = Status::Failed;
        self.error = Some(error.into());
        self.executed_at = Some(self.clock.now());
    }

    /// [`mark_started`](Self::mark_started) checked against `table`
    pub fn try_mark_started(&mut self, table: &TransitionTable) -> Result<(), DomainError> {
        table.check(self.status, Status::InProgress)?;
        self.mark_started();
        Ok(())
    }

    /// [`mark_completed`](Self::mark_completed) checked against `table`
    pub fn try_mark_completed(&mut self, table: &TransitionTable) -> Result<(), DomainError> {
        table.check(self.status, Status::Completed)?;
        self.mark_completed();
        Ok(())
    }

    /// [`mark_failed`](Self::mark_failed) checked against `table`
    pub fn try_mark_failed(
        &mut self,
        error: impl Into<String>,
        table: &TransitionTable,
    ) -> Result<(), DomainError> {
        table.check(self.status, Status::Failed)?;
        self.mark_failed(error);
        Ok(())
    }

    /// Overwrites the lifecycle fields with previously recorded values
    ///
    /// No transition rules apply. The error is kept whatever the status, so
    /// a completed operation that failed earlier keeps its error. A terminal
    /// status without a recorded `executed_at` is stamped with the clock.
    pub fn restore(
        &mut self,
        status: Status,
        error: Option<String>,
        created_at: Option<DateTime<Utc>>,
        executed_at: Option<DateTime<Utc>>,
    ) {
        self.status = status;
        self.error = error;
        if let Some(created_at) = created_at {
            self.created_at = created_at;
        }
        self.executed_at = match executed_at {
            Some(at) => Some(at),
            None if status.is_terminal() => Some(self.clock.now()),
            None => None,
        };
    }

    // --- Dependencies ---

    /// Adds a dependency on the operation whose old name is `key`
    ///
    /// Returns `Ok(false)` if it is already a dependency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SelfDependency` if `key` is this operation's own key.
    pub fn add_dependency(&mut self, key: OperationKey) -> Result<bool, DomainError> {
        if key == self.old_name {
            return Err(DomainError::SelfDependency(key.to_string()));
        }
        if self.depends_on(&key) {
            return Ok(false);
        }
        self.dependencies.push(key);
        Ok(true)
    }

    /// Adds a dependency on `other`
    pub fn add_dependency_on(&mut self, other: &RenameOperation) -> Result<bool, DomainError> {
        self.add_dependency(other.key().clone())
    }

    // --- Queries ---

    /// Returns true if every dependency is registered and completed
    pub fn can_execute<L>(&self, lookup: &L) -> bool
    where
        L: EntityLookup<OperationKey, RenameOperation> + ?Sized,
    {
        self.dependencies.iter().all(|key| {
            lookup
                .lookup(key)
                .is_some_and(|dep| dep.status() == Status::Completed)
        })
    }

    /// Returns true if any direct dependency has failed
    pub fn has_failed_dependency<L>(&self, lookup: &L) -> bool
    where
        L: EntityLookup<OperationKey, RenameOperation> + ?Sized,
    {
        self.dependencies.iter().any(|key| {
            lookup
                .lookup(key)
                .is_some_and(|dep| dep.status() == Status::Failed)
        })
    }

    /// Snapshot including the current `can_execute` result
    pub fn snapshot<L>(&self, lookup: &L) -> OperationSnapshot
    where
        L: EntityLookup<OperationKey, RenameOperation> + ?Sized,
    {
        OperationSnapshot {
            kind: self.kind,
            old_name: self.old_name.to_string(),
            new_name: self.new_name.clone(),
            target_path: self.target_path.clone(),
            status: self.status,
            error: self.error.clone(),
            can_execute: self.can_execute(lookup),
            dependency_count: self.dependencies.len(),
            created_at: self.created_at,
            executed_at: self.executed_at,
        }
    }
}
