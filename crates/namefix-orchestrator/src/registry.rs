//! Registry - owner of every conflict record and rename operation
//!
//! Entities refer to each other by key; the registry is the arena those
//! keys point into. All status changes go through the registry so that the
//! configured [`TransitionTable`] is applied and every dependent sees the
//! new status on its next eligibility check.
//!
//! Dependency edges are checked for cycles when they are added. Edges to
//! keys that are not (yet) registered are accepted; they keep the
//! dependent blocked and show up in [`Registry::check_graph`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use namefix_core::{
    domain::{
        ConflictKey, ConflictRecord, ConflictSnapshot, ConflictSummary, EntityLookup, NameKind,
        OperationKey, OperationSnapshot, RenameOperation, ReplacementNames, Severity, Status,
        TransitionTable,
    },
    ports::clock::{system_clock, SharedClock},
};

use crate::{
    error::OrchestratorError,
    graph::{self, DependencyMap},
};

// ============================================================================
// Reports
// ============================================================================

/// Number of entities in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: Status) {
        match status {
            Status::Pending => self.pending += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Completed => self.completed += 1,
            Status::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.failed
    }

    /// Share of entities completed, 0..=100; an empty set counts as done
    pub fn percent_complete(&self) -> u8 {
        match self.total() {
            0 => 100,
            total => ((self.completed * 100) / total) as u8,
        }
    }

    /// Returns true when nothing is pending or in progress
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

/// Aggregate progress over the whole registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub conflicts: StatusCounts,
    pub operations: StatusCounts,
}

/// Result of a static check of both dependency graphs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCheck {
    /// `(dependent, missing dependency)` pairs among conflicts
    pub missing_conflict_dependencies: Vec<(String, String)>,
    /// `(dependent, missing dependency)` pairs among operations
    pub missing_operation_dependencies: Vec<(String, String)>,
    /// Unfinished conflicts that can never become eligible
    pub stuck_conflicts: Vec<String>,
    /// Unfinished operations that can never become eligible
    pub stuck_operations: Vec<String>,
    /// Unfinished conflicts waiting (transitively) on a failed conflict
    pub blocked_conflicts: Vec<String>,
    /// Unfinished operations waiting (transitively) on a failed operation
    pub blocked_operations: Vec<String>,
}

impl GraphCheck {
    /// Returns true if every unfinished item can still be reached
    pub fn is_resolvable(&self) -> bool {
        self.stuck_conflicts.is_empty() && self.stuck_operations.is_empty()
    }
}

/// Serializable view of the whole registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub conflicts: Vec<ConflictSnapshot>,
    pub operations: Vec<OperationSnapshot>,
    pub progress: ProgressReport,
}

// ============================================================================
// Registry
// ============================================================================

/// Arena of conflict records and rename operations
#[derive(Debug)]
pub struct Registry {
    conflicts: BTreeMap<ConflictKey, ConflictRecord>,
    operations: BTreeMap<OperationKey, RenameOperation>,
    transitions: TransitionTable,
    clock: SharedClock,
}

impl Registry {
    /// Creates an empty registry with permissive transitions and the system clock
    pub fn new() -> Self {
        Self::with_settings(TransitionTable::permissive(), system_clock())
    }

    /// Creates an empty registry with explicit transition rules and clock
    pub fn with_settings(transitions: TransitionTable, clock: SharedClock) -> Self {
        Self {
            conflicts: BTreeMap::new(),
            operations: BTreeMap::new(),
            transitions,
            clock,
        }
    }

    /// Returns the transition table applied to status changes
    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Returns the clock new entities are stamped with
    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Creates and registers a conflict record using the registry clock
    pub fn create_conflict(
        &mut self,
        name: &str,
        kind: NameKind,
        locations: Vec<PathBuf>,
        severity: Severity,
    ) -> Result<ConflictKey, OrchestratorError> {
        let key = ConflictKey::new(name)?;
        let record =
            ConflictRecord::with_clock(key.clone(), kind, locations, severity, self.clock());
        self.register_conflict(record)?;
        Ok(key)
    }

    /// Creates and registers a rename operation using the registry clock
    pub fn create_operation(
        &mut self,
        kind: NameKind,
        old_name: &str,
        new_name: &str,
        target_path: impl Into<PathBuf>,
    ) -> Result<OperationKey, OrchestratorError> {
        let key = OperationKey::new(old_name)?;
        let operation =
            RenameOperation::with_clock(kind, key.clone(), new_name, target_path, self.clock())?;
        self.register_operation(operation)?;
        Ok(key)
    }

    /// Registers an existing conflict record
    ///
    /// Edges the record already carries are checked for cycles like any
    /// other edge.
    pub fn register_conflict(&mut self, record: ConflictRecord) -> Result<(), OrchestratorError> {
        let key = record.key().clone();
        if self.conflicts.contains_key(&key) {
            return Err(OrchestratorError::Duplicate(key.to_string()));
        }

        let graph = self.conflict_graph();
        for dep in record.dependencies() {
            reject_cycle(&graph, &key, dep)?;
        }

        debug!(
            conflict = %key,
            kind = %record.kind(),
            severity = %record.severity(),
            locations = record.locations().len(),
            "Registered conflict"
        );
        self.conflicts.insert(key, record);
        Ok(())
    }

    /// Registers an existing rename operation
    pub fn register_operation(
        &mut self,
        operation: RenameOperation,
    ) -> Result<(), OrchestratorError> {
        let key = operation.key().clone();
        if self.operations.contains_key(&key) {
            return Err(OrchestratorError::Duplicate(key.to_string()));
        }

        let graph = self.operation_graph();
        for dep in operation.dependencies() {
            reject_cycle(&graph, &key, dep)?;
        }

        debug!(
            operation = %key,
            new_name = %operation.new_name(),
            target = %operation.target_path().display(),
            "Registered rename operation"
        );
        self.operations.insert(key, operation);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Dependency edges
    // ------------------------------------------------------------------------

    /// Makes `dependent` wait for `dependency`
    ///
    /// Returns `Ok(false)` if the edge already existed.
    ///
    /// # Errors
    ///
    /// - `UnknownConflict` if `dependent` is not registered
    /// - `Domain(SelfDependency)` for a self edge
    /// - `CycleDetected` if the edge would close a cycle
    pub fn add_conflict_dependency(
        &mut self,
        dependent: &ConflictKey,
        dependency: &ConflictKey,
    ) -> Result<bool, OrchestratorError> {
        if !self.conflicts.contains_key(dependent) {
            return Err(OrchestratorError::UnknownConflict(dependent.to_string()));
        }
        if dependent != dependency {
            reject_cycle(&self.conflict_graph(), dependent, dependency)?;
        }

        let record = self
            .conflicts
            .get_mut(dependent)
            .ok_or_else(|| OrchestratorError::UnknownConflict(dependent.to_string()))?;
        let added = record.add_dependency(dependency.clone())?;
        if added {
            debug!(dependent = %dependent, dependency = %dependency, "Added conflict dependency");
        }
        Ok(added)
    }

    /// Makes operation `dependent` wait for operation `dependency`
    pub fn add_operation_dependency(
        &mut self,
        dependent: &OperationKey,
        dependency: &OperationKey,
    ) -> Result<bool, OrchestratorError> {
        if !self.operations.contains_key(dependent) {
            return Err(OrchestratorError::UnknownOperation(dependent.to_string()));
        }
        if dependent != dependency {
            reject_cycle(&self.operation_graph(), dependent, dependency)?;
        }

        let operation = self
            .operations
            .get_mut(dependent)
            .ok_or_else(|| OrchestratorError::UnknownOperation(dependent.to_string()))?;
        let added = operation.add_dependency(dependency.clone())?;
        if added {
            debug!(dependent = %dependent, dependency = %dependency, "Added operation dependency");
        }
        Ok(added)
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn conflict(&self, key: &ConflictKey) -> Option<&ConflictRecord> {
        self.conflicts.get(key)
    }

    pub fn operation(&self, key: &OperationKey) -> Option<&RenameOperation> {
        self.operations.get(key)
    }

    /// All conflicts, ordered by name
    pub fn conflicts(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.conflicts.values()
    }

    /// All operations, ordered by old name
    pub fn operations(&self) -> impl Iterator<Item = &RenameOperation> {
        self.operations.values()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    fn conflict_ref(&self, key: &ConflictKey) -> Result<&ConflictRecord, OrchestratorError> {
        self.conflicts
            .get(key)
            .ok_or_else(|| OrchestratorError::UnknownConflict(key.to_string()))
    }

    fn operation_ref(&self, key: &OperationKey) -> Result<&RenameOperation, OrchestratorError> {
        self.operations
            .get(key)
            .ok_or_else(|| OrchestratorError::UnknownOperation(key.to_string()))
    }

    // ------------------------------------------------------------------------
    // Eligibility
    // ------------------------------------------------------------------------

    /// Returns true if every dependency of the conflict is completed
    pub fn can_resolve(&self, key: &ConflictKey) -> Result<bool, OrchestratorError> {
        Ok(self.conflict_ref(key)?.can_resolve(&self.conflicts))
    }

    /// Returns true if every dependency of the operation is completed
    pub fn can_execute(&self, key: &OperationKey) -> Result<bool, OrchestratorError> {
        Ok(self.operation_ref(key)?.can_execute(&self.operations))
    }

    /// Pending conflicts whose dependencies are all completed, by name
    pub fn next_resolvable(&self) -> Vec<ConflictKey> {
        self.conflicts
            .values()
            .filter(|c| c.status() == Status::Pending && c.can_resolve(&self.conflicts))
            .map(|c| c.key().clone())
            .collect()
    }

    /// Pending operations whose dependencies are all completed, by old name
    pub fn next_executable(&self) -> Vec<OperationKey> {
        self.operations
            .values()
            .filter(|o| o.status() == Status::Pending && o.can_execute(&self.operations))
            .map(|o| o.key().clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Conflict mutators
    // ------------------------------------------------------------------------

    fn conflict_mut(&mut self, key: &ConflictKey) -> Result<&mut ConflictRecord, OrchestratorError> {
        self.conflicts
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::UnknownConflict(key.to_string()))
    }

    pub fn set_strategy(
        &mut self,
        key: &ConflictKey,
        strategy: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        self.conflict_mut(key)?.set_strategy(strategy);
        Ok(())
    }

    pub fn set_replacement_names(
        &mut self,
        key: &ConflictKey,
        names: impl Into<ReplacementNames>,
    ) -> Result<(), OrchestratorError> {
        self.conflict_mut(key)?.set_replacement_names(names);
        Ok(())
    }

    /// Moves a conflict to `status`, subject to the transition table
    pub fn update_conflict_status(
        &mut self,
        key: &ConflictKey,
        status: Status,
    ) -> Result<(), OrchestratorError> {
        let record = self
            .conflicts
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::UnknownConflict(key.to_string()))?;
        let from = record.status();
        record.try_update_status(status, &self.transitions)?;
        info!(conflict = %key, from = %from, to = %status, "Conflict status changed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Operation mutators
    // ------------------------------------------------------------------------

    pub fn mark_started(&mut self, key: &OperationKey) -> Result<(), OrchestratorError> {
        let operation = self
            .operations
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::UnknownOperation(key.to_string()))?;
        operation.try_mark_started(&self.transitions)?;
        debug!(operation = %key, "Operation started");
        Ok(())
    }

    pub fn mark_completed(&mut self, key: &OperationKey) -> Result<(), OrchestratorError> {
        let operation = self
            .operations
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::UnknownOperation(key.to_string()))?;
        operation.try_mark_completed(&self.transitions)?;
        info!(operation = %key, new_name = %operation.new_name(), "Operation completed");
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        key: &OperationKey,
        error: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        let error = error.into();
        let operation = self
            .operations
            .get_mut(key)
            .ok_or_else(|| OrchestratorError::UnknownOperation(key.to_string()))?;
        operation.try_mark_failed(error.clone(), &self.transitions)?;
        warn!(operation = %key, error = %error, "Operation failed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    pub fn conflict_summary(&self, key: &ConflictKey) -> Result<ConflictSummary, OrchestratorError> {
        Ok(self.conflict_ref(key)?.summary(&self.conflicts))
    }

    pub fn conflict_summaries(&self) -> Vec<ConflictSummary> {
        self.conflicts
            .values()
            .map(|c| c.summary(&self.conflicts))
            .collect()
    }

    pub fn conflict_snapshot(
        &self,
        key: &ConflictKey,
    ) -> Result<ConflictSnapshot, OrchestratorError> {
        Ok(self.conflict_ref(key)?.snapshot(&self.conflicts))
    }

    pub fn operation_snapshot(
        &self,
        key: &OperationKey,
    ) -> Result<OperationSnapshot, OrchestratorError> {
        Ok(self.operation_ref(key)?.snapshot(&self.operations))
    }

    /// Snapshot of every entity plus aggregate progress
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            conflicts: self
                .conflicts
                .values()
                .map(|c| c.snapshot(&self.conflicts))
                .collect(),
            operations: self
                .operations
                .values()
                .map(|o| o.snapshot(&self.operations))
                .collect(),
            progress: self.progress_report(),
        }
    }

    pub fn progress_report(&self) -> ProgressReport {
        let mut report = ProgressReport::default();
        for conflict in self.conflicts.values() {
            report.conflicts.record(conflict.status());
        }
        for operation in self.operations.values() {
            report.operations.record(operation.status());
        }
        report
    }

    // ------------------------------------------------------------------------
    // Graph analysis
    // ------------------------------------------------------------------------

    /// Conflict dependency graph keyed by name
    pub fn conflict_graph(&self) -> DependencyMap<ConflictKey> {
        self.conflicts
            .iter()
            .map(|(k, c)| (k.clone(), c.dependencies().to_vec()))
            .collect()
    }

    /// Operation dependency graph keyed by old name
    pub fn operation_graph(&self) -> DependencyMap<OperationKey> {
        self.operations
            .iter()
            .map(|(k, o)| (k.clone(), o.dependencies().to_vec()))
            .collect()
    }

    /// Unfinished conflicts and operations waiting on a failed item
    ///
    /// Failure is transitive: anything downstream of a failed item can
    /// never become eligible.
    pub fn blocked_by_failure(&self) -> (Vec<ConflictKey>, Vec<OperationKey>) {
        let failed_conflicts: BTreeSet<ConflictKey> = self
            .conflicts
            .values()
            .filter(|c| c.status() == Status::Failed)
            .map(|c| c.key().clone())
            .collect();
        let conflicts = graph::dependents_of(&self.conflict_graph(), &failed_conflicts)
            .into_iter()
            .filter(|k| self.conflicts.get(k).is_some_and(|c| !c.status().is_terminal()))
            .collect();

        let failed_operations: BTreeSet<OperationKey> = self
            .operations
            .values()
            .filter(|o| o.status() == Status::Failed)
            .map(|o| o.key().clone())
            .collect();
        let operations = graph::dependents_of(&self.operation_graph(), &failed_operations)
            .into_iter()
            .filter(|k| self.operations.get(k).is_some_and(|o| !o.status().is_terminal()))
            .collect();

        (conflicts, operations)
    }

    /// Finds missing dependencies, stuck items and items blocked by failures
    pub fn check_graph(&self) -> GraphCheck {
        let conflict_statuses: BTreeMap<ConflictKey, Status> = self
            .conflicts
            .iter()
            .map(|(k, c)| (k.clone(), c.status()))
            .collect();
        let (missing_c, stuck_c, blocked_c) =
            analyse(&self.conflict_graph(), &conflict_statuses);

        let operation_statuses: BTreeMap<OperationKey, Status> = self
            .operations
            .iter()
            .map(|(k, o)| (k.clone(), o.status()))
            .collect();
        let (missing_o, stuck_o, blocked_o) =
            analyse(&self.operation_graph(), &operation_statuses);

        GraphCheck {
            missing_conflict_dependencies: missing_c,
            missing_operation_dependencies: missing_o,
            stuck_conflicts: stuck_c,
            stuck_operations: stuck_o,
            blocked_conflicts: blocked_c,
            blocked_operations: blocked_o,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityLookup<ConflictKey, ConflictRecord> for Registry {
    fn lookup(&self, key: &ConflictKey) -> Option<&ConflictRecord> {
        self.conflicts.get(key)
    }
}

impl EntityLookup<OperationKey, RenameOperation> for Registry {
    fn lookup(&self, key: &OperationKey) -> Option<&RenameOperation> {
        self.operations.get(key)
    }
}

fn reject_cycle<K>(
    graph: &DependencyMap<K>,
    dependent: &K,
    dependency: &K,
) -> Result<(), OrchestratorError>
where
    K: Ord + Clone + std::fmt::Display,
{
    if let Some(cycle) = graph::cycle_with_edge(graph, dependent, dependency) {
        let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        warn!(cycle = %path.join(" -> "), "Rejected dependency that would close a cycle");
        return Err(OrchestratorError::CycleDetected { path });
    }
    Ok(())
}

type Analysis = (Vec<(String, String)>, Vec<String>, Vec<String>);

fn analyse<K>(graph: &DependencyMap<K>, statuses: &BTreeMap<K, Status>) -> Analysis
where
    K: Ord + Clone + std::fmt::Display,
{
    let unfinished = |k: &K| statuses.get(k).is_some_and(|s| !s.is_terminal());

    let missing: Vec<(String, String)> = graph
        .iter()
        .filter(|(k, _)| unfinished(*k))
        .flat_map(|(k, deps)| {
            deps.iter()
                .filter(move |d| !statuses.contains_key(*d))
                .map(move |d| (k.to_string(), d.to_string()))
        })
        .collect();

    let failed: BTreeSet<K> = statuses
        .iter()
        .filter(|(_, s)| **s == Status::Failed)
        .map(|(k, _)| k.clone())
        .collect();
    let blocked: BTreeSet<K> = graph::dependents_of(graph, &failed)
        .into_iter()
        .filter(|k| unfinished(k))
        .collect();

    let done: BTreeSet<K> = statuses
        .iter()
        .filter(|(_, s)| s.is_terminal())
        .map(|(k, _)| k.clone())
        .collect();
    let stuck: Vec<String> = match graph::waves(graph, &done) {
        Ok(_) => Vec::new(),
        Err(stuck) => stuck
            .into_iter()
            .filter(|k| !blocked.contains(k))
            .map(|k| k.to_string())
            .collect(),
    };

    (
        missing,
        stuck,
        blocked.into_iter().map(|k| k.to_string()).collect(),
    )
}
