//! Status lifecycle shared by conflict records and rename operations
//!
//! ## State Machine
//!
//! ```text
//!     ┌──────────┐   start    ┌────────────┐   succeed   ┌───────────┐
//!     │ Pending  │ ─────────► │ InProgress │ ──────────► │ Completed │
//!     └──────────┘            └────────────┘             └───────────┘
//!          │                        │
//!          │          fail          │ fail
//!          └────────────────────────┴────────────────► ┌───────────┐
//!                                                      │  Failed   │
//!                                                      └───────────┘
//! ```
//!
//! Which arrows are legal is decided by a [`TransitionTable`]. The
//! permissive table (the default) accepts every pair, matching the
//! historical unguarded behaviour. The strict table accepts only the
//! arrows drawn above.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Lifecycle status of a conflict record or rename operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Registered, not yet started
    #[default]
    Pending,
    /// Picked up by the orchestrator
    InProgress,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl Status {
    /// Every status, in lifecycle order
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Completed,
        Status::Failed,
    ];

    /// Returns true for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    /// Returns the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "InProgress",
            Status::Completed => "Completed",
            Status::Failed => "Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Named presets for the transition table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Any status may move to any status
    #[default]
    Permissive,
    /// Only forward moves; terminal statuses are final
    Strict,
}

impl fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransitionMode::Permissive => "permissive",
            TransitionMode::Strict => "strict",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TransitionMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(TransitionMode::Permissive),
            "strict" => Ok(TransitionMode::Strict),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown transition mode '{other}'; valid: permissive, strict"
            ))),
        }
    }
}

/// Explicit table of allowed `(from, to)` status pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    allowed: HashSet<(Status, Status)>,
}

impl TransitionTable {
    /// A table with no allowed transitions
    pub fn empty() -> Self {
        Self {
            allowed: HashSet::new(),
        }
    }

    /// Every pair allowed, including self-transitions
    pub fn permissive() -> Self {
        let mut table = Self::empty();
        for from in Status::ALL {
            for to in Status::ALL {
                table.allowed.insert((from, to));
            }
        }
        table
    }

    /// Forward-only lifecycle
    ///
    /// Valid transitions:
    /// - Pending -> InProgress, Completed, Failed
    /// - InProgress -> Completed, Failed
    /// - Completed, Failed -> (terminal, no transitions)
    pub fn strict() -> Self {
        Self::empty()
            .allow(Status::Pending, Status::InProgress)
            .allow(Status::Pending, Status::Completed)
            .allow(Status::Pending, Status::Failed)
            .allow(Status::InProgress, Status::Completed)
            .allow(Status::InProgress, Status::Failed)
    }

    /// Builds the preset table for a mode
    pub fn for_mode(mode: TransitionMode) -> Self {
        match mode {
            TransitionMode::Permissive => Self::permissive(),
            TransitionMode::Strict => Self::strict(),
        }
    }

    /// Adds an allowed transition
    pub fn allow(mut self, from: Status, to: Status) -> Self {
        self.allowed.insert((from, to));
        self
    }

    /// Removes an allowed transition
    pub fn forbid(mut self, from: Status, to: Status) -> Self {
        self.allowed.remove(&(from, to));
        self
    }

    /// Returns true if `from -> to` is allowed
    pub fn is_allowed(&self, from: Status, to: Status) -> bool {
        self.allowed.contains(&(from, to))
    }

    /// Checks a transition
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the transition is not allowed.
    pub fn check(&self, from: Status, to: Status) -> Result<(), DomainError> {
        if self.is_allowed(from, to) {
            Ok(())
        } else {
            Err(DomainError::InvalidState {
                from: from.name().to_string(),
                to: to.name().to_string(),
            })
        }
    }

    /// Allowed target statuses from `from`, in lifecycle order
    pub fn targets(&self, from: Status) -> Vec<Status> {
        Status::ALL
            .into_iter()
            .filter(|to| self.is_allowed(from, *to))
            .collect()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::permissive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default_is_pending() {
        assert_eq!(Status::default(), Status::Pending);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::InProgress.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
    }

    #[test]
    fn test_status_display_and_serde() {
        assert_eq!(Status::InProgress.to_string(), "in_progress");
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Status::InProgress);
    }

    #[test]
    fn test_permissive_allows_everything() {
        let table = TransitionTable::permissive();
        for from in Status::ALL {
            for to in Status::ALL {
                assert!(table.is_allowed(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_strict_blocks_terminal_exits() {
        let table = TransitionTable::strict();
        assert!(table.is_allowed(Status::Pending, Status::InProgress));
        assert!(table.is_allowed(Status::InProgress, Status::Completed));
        assert!(!table.is_allowed(Status::Completed, Status::Pending));
        assert!(!table.is_allowed(Status::Failed, Status::Completed));
        assert!(table.targets(Status::Completed).is_empty());
        assert!(table.targets(Status::Failed).is_empty());
    }

    #[test]
    fn test_check_reports_names() {
        let err = TransitionTable::strict()
            .check(Status::Failed, Status::Completed)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidState {
                from: "Failed".to_string(),
                to: "Completed".to_string(),
            }
        );
    }

    #[test]
    fn test_layering_on_top_of_preset() {
        let table = TransitionTable::strict().allow(Status::Failed, Status::Pending);
        assert!(table.is_allowed(Status::Failed, Status::Pending));

        let table = TransitionTable::permissive().forbid(Status::Completed, Status::Pending);
        assert!(!table.is_allowed(Status::Completed, Status::Pending));
        assert!(table.is_allowed(Status::Completed, Status::Failed));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "strict".parse::<TransitionMode>().unwrap(),
            TransitionMode::Strict
        );
        assert!("lenient".parse::<TransitionMode>().is_err());
        assert_eq!(
            TransitionTable::for_mode(TransitionMode::Permissive),
            TransitionTable::default()
        );
    }
}
