//! Shared registry of side effects awaiting compensation.
//!
//! Test steps register the entities they create (a book added to a user's
//! collection, for example) under their own test key; the fixture drains the
//! key at teardown and issues the compensating calls. The registry itself
//! performs no I/O.

use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// What kind of resource a cleanup entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A book present in a user's collection.
    CollectionBook,
}

/// A recorded side effect requiring a compensating action at teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    pub kind: ResourceKind,
    /// User id owning the resource.
    pub owner: String,
    /// Token authorizing the compensating call.
    pub token: String,
    /// Resource identifier, e.g. an isbn.
    pub resource: String,
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, Vec<CleanupEntry>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<CleanupEntry>>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append an entry under `test_key`. Registrations accumulate; they are
    /// never overwritten.
    pub fn register(&self, test_key: &str, entry: CleanupEntry) {
        self.lock()
            .entry(test_key.to_string())
            .or_default()
            .push(entry);
    }

    /// Remove and return the entries for `test_key` in registration order.
    /// Draining an absent key yields an empty vec; a second drain of the same
    /// key always does.
    pub fn drain(&self, test_key: &str) -> Vec<CleanupEntry> {
        self.lock().remove(test_key).unwrap_or_default()
    }

    /// Drop every registered entry. Called once at suite startup.
    pub fn reset(&self) {
        self.lock().clear();
    }
}

/// Append an entry to the process-wide registry.
pub fn register(test_key: &str, entry: CleanupEntry) {
    REGISTRY.register(test_key, entry);
}

/// Drain the process-wide registry for `test_key`.
pub fn drain(test_key: &str) -> Vec<CleanupEntry> {
    REGISTRY.drain(test_key)
}

/// Clear the process-wide registry.
pub fn reset() {
    REGISTRY.reset();
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(resource: &str) -> CleanupEntry {
        CleanupEntry {
            kind: ResourceKind::CollectionBook,
            owner: "user-1".into(),
            token: "token-1".into(),
            resource: resource.into(),
        }
    }

    #[test]
    fn drain_returns_entries_in_registration_order() {
        let registry = Registry::default();
        registry.register("add_book::single", entry("9781449325862"));
        registry.register("add_book::single", entry("9781449337711"));

        let drained = registry.drain("add_book::single");
        assert_eq!(
            drained.iter().map(|e| e.resource.as_str()).collect::<Vec<_>>(),
            vec!["9781449325862", "9781449337711"]
        );
    }

    #[test]
    fn second_drain_is_empty() {
        let registry = Registry::default();
        registry.register("replace_book::happy", entry("9781449325862"));

        assert_eq!(registry.drain("replace_book::happy").len(), 1);
        assert!(registry.drain("replace_book::happy").is_empty());
    }

    #[test]
    fn draining_unknown_key_is_not_an_error() {
        let registry = Registry::default();
        assert!(registry.drain("never_registered").is_empty());
    }

    #[test]
    fn keys_are_isolated() {
        let registry = Registry::default();
        registry.register("suite_a::case", entry("aaa"));
        registry.register("suite_b::case", entry("bbb"));

        assert_eq!(registry.drain("suite_a::case")[0].resource, "aaa");
        assert_eq!(registry.drain("suite_b::case")[0].resource, "bbb");
    }

    #[test]
    fn reset_clears_everything() {
        let registry = Registry::default();
        registry.register("suite::case", entry("aaa"));
        registry.reset();
        assert!(registry.drain("suite::case").is_empty());
    }
}
