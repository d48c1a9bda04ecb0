//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including key validation failures, self-referencing dependencies and
//! refused state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Entity key is empty or otherwise unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// An entity was asked to depend on itself
    #[error("Entity cannot depend on itself: {0}")]
    SelfDependency(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidKey("".to_string());
        assert_eq!(err.to_string(), "Invalid key: ");

        let err = DomainError::SelfDependency("UserService".to_string());
        assert_eq!(
            err.to_string(),
            "Entity cannot depend on itself: UserService"
        );

        let err = DomainError::InvalidState {
            from: "Completed".to_string(),
            to: "Pending".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Completed to Pending"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::SelfDependency("A".to_string());
        let err2 = DomainError::SelfDependency("A".to_string());
        let err3 = DomainError::SelfDependency("B".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
