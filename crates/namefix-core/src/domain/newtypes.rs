//! Domain newtypes with validation
//!
//! Entities never hold references to each other. Dependency edges are stored
//! as these keys and resolved through the registry that owns the entities.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Name kind
// ============================================================================

/// What kind of identifier collides or is being renamed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKind {
    /// A class (or other type) name declared in source
    Class,
    /// A file name on disk
    File,
}

impl Display for NameKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameKind::Class => "class",
            NameKind::File => "file",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NameKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "class" => Ok(NameKind::Class),
            "file" => Ok(NameKind::File),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown name kind '{other}'; valid: class, file"
            ))),
        }
    }
}

// ============================================================================
// Entity keys
// ============================================================================

fn validate_key(raw: &str, what: &str) -> Result<(), DomainError> {
    if raw.trim().is_empty() {
        return Err(DomainError::InvalidKey(format!("{what} must not be empty")));
    }
    if raw.trim() != raw {
        return Err(DomainError::InvalidKey(format!(
            "{what} must not have surrounding whitespace: '{raw}'"
        )));
    }
    Ok(())
}

/// Key of a [`ConflictRecord`](super::ConflictRecord): the colliding name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConflictKey(String);

impl ConflictKey {
    /// Create a new ConflictKey
    ///
    /// # Errors
    /// Returns error if the name is empty or padded with whitespace
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        validate_key(&name, "conflict name")?;
        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConflictKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ConflictKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ConflictKey> for String {
    fn from(key: ConflictKey) -> Self {
        key.0
    }
}

/// Key of a [`RenameOperation`](super::RenameOperation): its old name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationKey(String);

impl OperationKey {
    /// Create a new OperationKey
    ///
    /// # Errors
    /// Returns error if the name is empty or padded with whitespace
    pub fn new(old_name: impl Into<String>) -> Result<Self, DomainError> {
        let old_name = old_name.into();
        validate_key(&old_name, "operation old name")?;
        Ok(Self(old_name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OperationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for OperationKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OperationKey> for String {
    fn from(key: OperationKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod name_kind_tests {
        use super::*;

        #[test]
        fn test_display() {
            assert_eq!(NameKind::Class.to_string(), "class");
            assert_eq!(NameKind::File.to_string(), "file");
        }

        #[test]
        fn test_from_str_is_case_insensitive() {
            assert_eq!("Class".parse::<NameKind>().unwrap(), NameKind::Class);
            assert_eq!("FILE".parse::<NameKind>().unwrap(), NameKind::File);
            assert!("module".parse::<NameKind>().is_err());
        }

        #[test]
        fn test_serialization() {
            let json = serde_json::to_string(&NameKind::Class).unwrap();
            assert_eq!(json, "\"class\"");
        }
    }

    mod key_tests {
        use super::*;

        #[test]
        fn test_valid_keys() {
            let key = ConflictKey::new("UserService").unwrap();
            assert_eq!(key.as_str(), "UserService");
            assert_eq!(key.to_string(), "UserService");

            let key: OperationKey = "utils.js".parse().unwrap();
            assert_eq!(key.as_str(), "utils.js");
        }

        #[test]
        fn test_empty_key_rejected() {
            assert!(matches!(
                ConflictKey::new(""),
                Err(DomainError::InvalidKey(_))
            ));
            assert!(matches!(
                OperationKey::new("   "),
                Err(DomainError::InvalidKey(_))
            ));
        }

        #[test]
        fn test_padded_key_rejected() {
            assert!(ConflictKey::new(" Foo").is_err());
            assert!(OperationKey::new("Foo\n").is_err());
        }

        #[test]
        fn test_deserialize_validates() {
            let ok: ConflictKey = serde_json::from_str("\"Foo\"").unwrap();
            assert_eq!(ok.as_str(), "Foo");

            let bad: Result<ConflictKey, _> = serde_json::from_str("\"\"");
            assert!(bad.is_err());
        }

        #[test]
        fn test_keys_order_lexically() {
            let mut keys = vec![
                OperationKey::new("b").unwrap(),
                OperationKey::new("a").unwrap(),
            ];
            keys.sort();
            assert_eq!(keys[0].as_str(), "a");
        }
    }
}
