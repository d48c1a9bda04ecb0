//! Domain entities and business logic
//!
//! This module contains the core domain types for namefix:
//! - Newtypes for validated entity keys
//! - The shared status lifecycle and transition table
//! - Naming conflict records
//! - Rename operations
//! - Domain-specific error types

pub mod conflict_record;
pub mod errors;
pub mod lookup;
pub mod newtypes;
pub mod rename_operation;
pub mod status;

// Re-export commonly used types
pub use conflict_record::{
    ConflictRecord, ConflictSnapshot, ConflictSummary, DependencyRef, ReplacementNames, Severity,
};
pub use errors::DomainError;
pub use lookup::EntityLookup;
pub use newtypes::{ConflictKey, NameKind, OperationKey};
pub use rename_operation::{OperationSnapshot, RenameOperation};
pub use status::{Status, TransitionMode, TransitionTable};
