//! Key-based access to registered entities
//!
//! Dependency checks need to see the current status of other entities.
//! Entities only store keys, so every check is given something that can
//! turn a key back into the canonical instance.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Resolves a key to the entity registered under it
pub trait EntityLookup<K, V> {
    /// Returns the entity for `key`, or `None` if nothing is registered
    fn lookup(&self, key: &K) -> Option<&V>;
}

impl<K, V> EntityLookup<K, V> for HashMap<K, V>
where
    K: Eq + Hash,
{
    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }
}

impl<K, V> EntityLookup<K, V> for BTreeMap<K, V>
where
    K: Ord,
{
    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }
}
