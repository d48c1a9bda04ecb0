//! ConflictRecord domain entity
//!
//! A conflict record tracks one duplicate class or file name found at
//! several locations, the strategy chosen to disambiguate it, and the
//! replacement names picked for each location.
//!
//! Records may depend on other records (for example when two conflicts
//! touch the same class hierarchy). A record is resolvable only once every
//! record it depends on has completed. Status changes never cascade: a
//! dependent sees a dependency complete the next time it is polled.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::lookup::EntityLookup;
use super::newtypes::{ConflictKey, NameKind};
use super::status::{Status, TransitionTable};
use crate::ports::clock::{system_clock, SharedClock};

// ============================================================================
// Severity
// ============================================================================

/// Informational priority of a conflict
///
/// Severity is reported but never influences ordering; only dependencies do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown severity '{other}'; valid: high, medium, low"
            ))),
        }
    }
}

// ============================================================================
// ReplacementNames
// ============================================================================

/// One or many replacement names, normalized to a list
///
/// Lets callers pass a single name or a sequence to
/// [`ConflictRecord::set_replacement_names`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementNames(Vec<String>);

impl ReplacementNames {
    /// Consumes the wrapper, returning the names in order
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for ReplacementNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ReplacementNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for ReplacementNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for ReplacementNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ReplacementNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Read-only reporting view of a conflict, computed fresh on each call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub name: String,
    pub kind: NameKind,
    pub severity: Severity,
    pub status: Status,
    pub location_count: usize,
    /// Progress formatted as a percentage, e.g. `"50%"`
    pub progress: String,
    pub can_resolve: bool,
}

/// Shallow view of a dependency inside a snapshot
///
/// Never includes the dependency's own dependencies. `kind` and `status`
/// are absent when the key does not resolve to a registered record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NameKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Full serializable snapshot of a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSnapshot {
    pub name: String,
    pub kind: NameKind,
    pub locations: Vec<PathBuf>,
    pub severity: Severity,
    pub strategy: Option<String>,
    pub replacement_names: Vec<String>,
    pub status: Status,
    pub progress: u8,
    pub can_resolve: bool,
    pub dependencies: Vec<DependencyRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// ConflictRecord
// ============================================================================

/// A duplicate-name conflict and its resolution state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The colliding identifier, also the record's key
    name: ConflictKey,
    /// Whether a class or a file name collides
    kind: NameKind,
    /// Files involved, in detection order
    locations: Vec<PathBuf>,
    /// Informational priority
    severity: Severity,
    /// Free-form resolution description, absent until assigned
    strategy: Option<String>,
    /// Chosen replacement names, usually one per location
    replacement_names: Vec<String>,
    /// Current lifecycle status
    status: Status,
    /// Keys of records that must complete first (append-only, deduplicated)
    dependencies: Vec<ConflictKey>,
    /// When the record was created
    created_at: DateTime<Utc>,
    /// When the record was last mutated
    updated_at: DateTime<Utc>,
    #[serde(skip, default = "system_clock")]
    clock: SharedClock,
}

impl ConflictRecord {
    /// Creates a new pending conflict stamped with the system clock
    ///
    /// # Example
    ///
    /// ```
    /// use namefix_core::domain::{ConflictKey, ConflictRecord, NameKind, Severity, Status};
    /// use std::path::PathBuf;
    ///
    /// let record = ConflictRecord::new(
    ///     ConflictKey::new("UserService").unwrap(),
    ///     NameKind::Class,
    ///     vec![PathBuf::from("src/a/user.ts"), PathBuf::from("src/b/user.ts")],
    ///     Severity::High,
    /// );
    ///
    /// assert_eq!(record.status(), Status::Pending);
    /// assert_eq!(record.progress(), 0);
    /// ```
    pub fn new(
        name: ConflictKey,
        kind: NameKind,
        locations: Vec<PathBuf>,
        severity: Severity,
    ) -> Self {
        Self::with_clock(name, kind, locations, severity, system_clock())
    }

    /// Creates a new pending conflict that reads time from `clock`
    pub fn with_clock(
        name: ConflictKey,
        kind: NameKind,
        locations: Vec<PathBuf>,
        severity: Severity,
        clock: SharedClock,
    ) -> Self {
        let now = clock.now();
        Self {
            name,
            kind,
            locations,
            severity,
            strategy: None,
            replacement_names: Vec::new(),
            status: Status::Pending,
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
            clock,
        }
    }

    // --- Getters ---

    /// Returns the record's key
    pub fn key(&self) -> &ConflictKey {
        &self.name
    }

    /// Returns the colliding name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn strategy(&self) -> Option<&str> {
        self.strategy.as_deref()
    }

    pub fn replacement_names(&self) -> &[String] {
        &self.replacement_names
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the dependency keys in insertion order
    pub fn dependencies(&self) -> &[ConflictKey] {
        &self.dependencies
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if `key` is a direct dependency
    pub fn depends_on(&self, key: &ConflictKey) -> bool {
        self.dependencies.contains(key)
    }

    // --- Mutators ---

    fn touch(&mut self) {
        self.updated_at = self.clock.now();
    }

    /// Assigns the resolution strategy
    pub fn set_strategy(&mut self, strategy: impl Into<String>) {
        self.strategy = Some(strategy.into());
        self.touch();
    }

    /// Replaces the replacement names with one name or a list of names
    pub fn set_replacement_names(&mut self, names: impl Into<ReplacementNames>) {
        self.replacement_names = names.into().into_vec();
        self.touch();
    }

    /// Moves to `status` without any legality check
    pub fn update_status(&mut self, status: Status) {
        self.status = status;
        self.touch();
    }

    /// Overwrites status and timestamps with previously recorded values
    ///
    /// Used when loading saved state: no transition rules apply and the
    /// clock is not read. Absent timestamps keep their current value.
    pub fn restore(
        &mut self,
        status: Status,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        self.status = status;
        if let Some(created_at) = created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Moves to `status` if `table` allows it
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the transition is refused; the
    /// record is left untouched.
    pub fn try_update_status(
        &mut self,
        status: Status,
        table: &TransitionTable,
    ) -> Result<(), DomainError> {
        table.check(self.status, status)?;
        self.update_status(status);
        Ok(())
    }

    /// Adds a dependency on the record named `key`
    ///
    /// Returns `Ok(true)` if the edge was added and `Ok(false)` if a
    /// dependency with the same name already exists. `updated_at` only moves
    /// on insertion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SelfDependency` if `key` is this record's own name.
    pub fn add_dependency(&mut self, key: ConflictKey) -> Result<bool, DomainError> {
        if key == self.name {
            return Err(DomainError::SelfDependency(key.to_string()));
        }
        if self.depends_on(&key) {
            return Ok(false);
        }
        self.dependencies.push(key);
        self.touch();
        Ok(true)
    }

    /// Adds a dependency on `other`
    pub fn add_dependency_on(&mut self, other: &ConflictRecord) -> Result<bool, DomainError> {
        self.add_dependency(other.key().clone())
    }

    // --- Queries ---

    /// Returns true if every dependency is registered and completed
    ///
    /// A dependency that `lookup` cannot find counts as not completed.
    pub fn can_resolve<L>(&self, lookup: &L) -> bool
    where
        L: EntityLookup<ConflictKey, ConflictRecord> + ?Sized,
    {
        self.dependencies.iter().all(|key| {
            lookup
                .lookup(key)
                .is_some_and(|dep| dep.status() == Status::Completed)
        })
    }

    /// Dependencies that are not yet completed (including unregistered ones)
    pub fn outstanding_dependencies<L>(&self, lookup: &L) -> Vec<&ConflictKey>
    where
        L: EntityLookup<ConflictKey, ConflictRecord> + ?Sized,
    {
        self.dependencies
            .iter()
            .filter(|key| {
                !lookup
                    .lookup(key)
                    .is_some_and(|dep| dep.status() == Status::Completed)
            })
            .collect()
    }

    /// Progress derived only from the status
    ///
    /// Pending 0, InProgress 50, Completed 100, Failed 0.
    pub fn progress(&self) -> u8 {
        match self.status {
            Status::Pending => 0,
            Status::InProgress => 50,
            Status::Completed => 100,
            Status::Failed => 0,
        }
    }

    /// Reporting view, recomputed on every call
    pub fn summary<L>(&self, lookup: &L) -> ConflictSummary
    where
        L: EntityLookup<ConflictKey, ConflictRecord> + ?Sized,
    {
        ConflictSummary {
            name: self.name.to_string(),
            kind: self.kind,
            severity: self.severity,
            status: self.status,
            location_count: self.locations.len(),
            progress: format!("{}%", self.progress()),
            can_resolve: self.can_resolve(lookup),
        }
    }

    /// Full snapshot with a shallow projection of each dependency
    pub fn snapshot<L>(&self, lookup: &L) -> ConflictSnapshot
    where
        L: EntityLookup<ConflictKey, ConflictRecord> + ?Sized,
    {
        let dependencies = self
            .dependencies
            .iter()
            .map(|key| {
                let dep = lookup.lookup(key);
                DependencyRef {
                    name: key.to_string(),
                    kind: dep.map(|d| d.kind()),
                    status: dep.map(|d| d.status()),
                }
            })
            .collect();

        ConflictSnapshot {
            name: self.name.to_string(),
            kind: self.kind,
            locations: self.locations.clone(),
            severity: self.severity,
            strategy: self.strategy.clone(),
            replacement_names: self.replacement_names.clone(),
            status: self.status,
            progress: self.progress(),
            can_resolve: self.can_resolve(lookup),
            dependencies,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn key(name: &str) -> ConflictKey {
        ConflictKey::new(name).unwrap()
    }

    fn record(name: &str) -> ConflictRecord {
        ConflictRecord::new(
            key(name),
            NameKind::Class,
            vec![
                PathBuf::from(format!("src/a/{name}.ts")),
                PathBuf::from(format!("src/b/{name}.ts")),
            ],
            Severity::Medium,
        )
    }

    fn registry(records: Vec<ConflictRecord>) -> HashMap<ConflictKey, ConflictRecord> {
        records.into_iter().map(|r| (r.key().clone(), r)).collect()
    }

    fn clocked(name: &str) -> (ConflictRecord, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let record = ConflictRecord::with_clock(
            key(name),
            NameKind::File,
            vec![PathBuf::from("a/index.js")],
            Severity::Low,
            clock.clone(),
        );
        (record, clock)
    }

    #[test]
    fn test_new_record_defaults() {
        let r = record("UserService");
        assert_eq!(r.name(), "UserService");
        assert_eq!(r.kind(), NameKind::Class);
        assert_eq!(r.locations().len(), 2);
        assert_eq!(r.status(), Status::Pending);
        assert!(r.strategy().is_none());
        assert!(r.replacement_names().is_empty());
        assert!(r.dependencies().is_empty());
        assert_eq!(r.created_at(), r.updated_at());
    }

    #[test]
    fn test_set_strategy_touches_updated_at() {
        let (mut r, clock) = clocked("index.js");
        let created = r.created_at();
        clock.advance(Duration::seconds(5));

        r.set_strategy("prefix with module name");

        assert_eq!(r.strategy(), Some("prefix with module name"));
        assert_eq!(r.updated_at(), created + Duration::seconds(5));
        assert_eq!(r.created_at(), created);
    }

    #[test]
    fn test_set_replacement_names_accepts_single_or_many() {
        let mut r = record("Logger");

        r.set_replacement_names("AppLogger");
        assert_eq!(r.replacement_names(), ["AppLogger".to_string()]);

        r.set_replacement_names(vec!["CoreLogger", "UiLogger"]);
        assert_eq!(
            r.replacement_names(),
            ["CoreLogger".to_string(), "UiLogger".to_string()]
        );

        r.set_replacement_names(Vec::<String>::new());
        assert!(r.replacement_names().is_empty());
    }

    #[test]
    fn test_update_status_is_unguarded() {
        let mut r = record("Config");
        r.update_status(Status::Completed);
        r.update_status(Status::Pending);
        assert_eq!(r.status(), Status::Pending);
        r.update_status(Status::Failed);
        r.update_status(Status::InProgress);
        assert_eq!(r.status(), Status::InProgress);
    }

    #[test]
    fn test_try_update_status_with_strict_table() {
        let table = TransitionTable::strict();
        let mut r = record("Config");
        r.try_update_status(Status::InProgress, &table).unwrap();
        r.try_update_status(Status::Completed, &table).unwrap();

        let err = r.try_update_status(Status::Pending, &table).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert_eq!(r.status(), Status::Completed);
    }

    #[test]
    fn test_restore_keeps_recorded_timestamps() {
        let mut record = ConflictRecord::new(
            ConflictKey::new("Logger").unwrap(),
            NameKind::Class,
            vec![],
            Severity::Low,
        );
        let created = Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2023, 5, 2, 9, 30, 0).unwrap();

        record.restore(Status::Completed, Some(created), Some(updated));

        assert_eq!(record.status(), Status::Completed);
        assert_eq!(record.created_at(), created);
        assert_eq!(record.updated_at(), updated);
    }

    #[test]
    fn test_add_dependency_is_idempotent() {
        let (mut r, clock) = clocked("index.js");
        clock.advance(Duration::seconds(1));
        assert!(r.add_dependency(key("Router")).unwrap());
        let stamped = r.updated_at();

        clock.advance(Duration::seconds(1));
        assert!(!r.add_dependency(key("Router")).unwrap());

        assert_eq!(r.dependencies().len(), 1);
        assert_eq!(r.updated_at(), stamped);
    }

    #[test]
    fn test_add_dependency_rejects_self() {
        let mut r = record("Router");
        let err = r.add_dependency(key("Router")).unwrap_err();
        assert_eq!(err, DomainError::SelfDependency("Router".to_string()));
        assert!(r.dependencies().is_empty());
    }

    #[test]
    fn test_can_resolve_without_dependencies() {
        let r = record("Router");
        let lookup: HashMap<ConflictKey, ConflictRecord> = HashMap::new();
        assert!(r.can_resolve(&lookup));
    }

    #[test]
    fn test_dependency_completion_unblocks_dependent() {
        let a = record("A");
        let mut b = record("B");
        assert!(a.can_resolve(&registry(vec![])));

        b.add_dependency_on(&a).unwrap();
        let mut reg = registry(vec![a]);
        assert!(!b.can_resolve(&reg));

        for status in [Status::Pending, Status::InProgress, Status::Failed] {
            reg.get_mut(&key("A")).unwrap().update_status(status);
            assert!(!b.can_resolve(&reg), "blocked while A is {status}");
        }

        reg.get_mut(&key("A")).unwrap().update_status(Status::Completed);
        assert!(b.can_resolve(&reg));
    }

    #[test]
    fn test_unregistered_dependency_blocks() {
        let mut b = record("B");
        b.add_dependency(key("Ghost")).unwrap();
        let reg = registry(vec![]);
        assert!(!b.can_resolve(&reg));
        assert_eq!(b.outstanding_dependencies(&reg), vec![&key("Ghost")]);
    }

    #[test]
    fn test_progress_mapping() {
        let mut r = record("A");
        r.add_dependency(key("B")).unwrap();
        r.add_dependency(key("C")).unwrap();

        let expected = [
            (Status::Pending, 0),
            (Status::InProgress, 50),
            (Status::Completed, 100),
            (Status::Failed, 0),
        ];
        for (status, progress) in expected {
            r.update_status(status);
            assert_eq!(r.progress(), progress);
        }
    }

    #[test]
    fn test_summary_is_fresh() {
        let a = record("A");
        let mut b = record("B");
        b.add_dependency_on(&a).unwrap();
        b.update_status(Status::InProgress);
        let mut reg = registry(vec![a]);

        let summary = b.summary(&reg);
        assert_eq!(summary.name, "B");
        assert_eq!(summary.location_count, 2);
        assert_eq!(summary.progress, "50%");
        assert!(!summary.can_resolve);

        reg.get_mut(&key("A")).unwrap().update_status(Status::Completed);
        assert!(b.summary(&reg).can_resolve);
    }

    #[test]
    fn test_snapshot_projects_dependencies_shallowly() {
        let mut a = record("A");
        a.add_dependency(key("Deep")).unwrap();
        let mut c = record("C");
        c.update_status(Status::Completed);

        let mut b = record("B");
        b.add_dependency_on(&a).unwrap();
        b.add_dependency_on(&c).unwrap();
        b.set_strategy("rename by package");
        let reg = registry(vec![a, c]);

        let snapshot = b.snapshot(&reg);
        assert_eq!(snapshot.dependencies.len(), 2);
        assert_eq!(snapshot.dependencies[0].name, "A");
        assert_eq!(snapshot.dependencies[0].status, Some(Status::Pending));
        assert_eq!(snapshot.dependencies[1].kind, Some(NameKind::Class));
        assert_eq!(snapshot.dependencies[1].status, Some(Status::Completed));
        assert!(!snapshot.can_resolve);

        let json = serde_json::to_value(&snapshot).unwrap();
        let deps = json["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 2);
        for dep in deps {
            let fields: Vec<&String> = dep.as_object().unwrap().keys().collect();
            assert_eq!(fields.len(), 3);
            assert!(dep.get("dependencies").is_none());
        }
    }

    #[test]
    fn test_snapshot_marks_unregistered_dependency() {
        let mut b = record("B");
        b.add_dependency(key("Ghost")).unwrap();
        let snapshot = b.snapshot(&registry(vec![]));
        assert_eq!(snapshot.dependencies[0].kind, None);

        let json = serde_json::to_value(&snapshot.dependencies[0]).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ghost"}));
    }

    #[test]
    fn test_severity_parse_and_display() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(Severity::Low.to_string(), "low");
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_record_serde_roundtrip_keeps_fields() {
        let mut r = record("A");
        r.add_dependency(key("B")).unwrap();
        r.set_replacement_names(vec!["A1", "A2"]);

        let json = serde_json::to_string(&r).unwrap();
        let back: ConflictRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key(), r.key());
        assert_eq!(back.dependencies(), r.dependencies());
        assert_eq!(back.replacement_names(), r.replacement_names());
        assert_eq!(back.updated_at(), r.updated_at());
    }
}
