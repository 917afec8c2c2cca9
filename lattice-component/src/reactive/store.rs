//! State Store
//!
//! A reactive key-value store. Every component owns one, created fresh per
//! instance and never shared.
//!
//! # Dependency Granularity
//!
//! - [`get`](StateStore::get) and [`has`](StateStore::has) depend on a
//!   single key: writes to other keys do not invalidate the reader.
//! - [`equals`](StateStore::equals) depends on the pair (key, value): the
//!   reader is only invalidated when the key moves to or away from that
//!   value, i.e. when the boolean result can change.
//! - [`all`](StateStore::all) depends on every write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use super::context::Tracker;
use super::dependency::Dependency;

/// Reactive key-value store.
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    values: RwLock<IndexMap<String, Value>>,
    key_deps: DashMap<String, Dependency>,
    /// key -> serialized value -> dependency
    value_deps: DashMap<String, HashMap<String, Dependency>>,
    all_dep: Dependency,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value for `key`, depending on that key.
    pub fn get(&self, key: &str, tracker: &Tracker) -> Option<Value> {
        self.depend_key(key, tracker);
        self.inner.values.read().get(key).cloned()
    }

    /// Check whether `key` holds a value, depending on that key.
    pub fn has(&self, key: &str, tracker: &Tracker) -> bool {
        self.depend_key(key, tracker);
        self.inner.values.read().contains_key(key)
    }

    /// Check whether `key` currently equals `value`.
    ///
    /// Only creates a dependency on the key's value matching `value`.
    pub fn equals(&self, key: &str, value: &Value, tracker: &Tracker) -> bool {
        if tracker.is_active() {
            let dependency = self
                .inner
                .value_deps
                .entry(key.to_owned())
                .or_default()
                .entry(value.to_string())
                .or_default()
                .clone();
            dependency.depend(tracker);
        }
        self.inner.values.read().get(key) == Some(value)
    }

    /// Snapshot of every entry, depending on any write.
    pub fn all(&self, tracker: &Tracker) -> IndexMap<String, Value> {
        self.inner.all_dep.depend(tracker);
        self.inner.values.read().clone()
    }

    /// Keys in insertion order, without tracking.
    pub fn keys(&self) -> Vec<String> {
        self.inner.values.read().keys().cloned().collect()
    }

    /// Number of entries, without tracking.
    pub fn len(&self) -> usize {
        self.inner.values.read().len()
    }

    /// Check if the store is empty, without tracking.
    pub fn is_empty(&self) -> bool {
        self.inner.values.read().is_empty()
    }

    /// Store `value` under `key`.
    ///
    /// Returns `false` without invalidating anything if the key already
    /// holds an equal value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();

        let previous = {
            let mut values = self.inner.values.write();
            match values.get(&key) {
                Some(current) if *current == value => return false,
                _ => values.insert(key.clone(), value.clone()),
            }
        };

        self.changed(&key, previous.as_ref(), Some(&value));
        true
    }

    /// Store `value` only if `key` holds nothing yet.
    pub fn set_default(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        {
            let mut values = self.inner.values.write();
            if values.contains_key(&key) {
                return false;
            }
            values.insert(key.clone(), value.clone());
        }

        self.changed(&key, None, Some(&value));
        true
    }

    /// Remove `key`. Returns `true` if it held a value.
    pub fn delete(&self, key: &str) -> bool {
        let previous = self.inner.values.write().shift_remove(key);
        match previous {
            Some(previous) => {
                self.changed(key, Some(&previous), None);
                true
            }
            None => false,
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.inner.values.write());
        for (key, value) in &previous {
            self.changed(key, Some(value), None);
        }
    }

    fn depend_key(&self, key: &str, tracker: &Tracker) {
        if tracker.is_active() {
            let dependency = self
                .inner
                .key_deps
                .entry(key.to_owned())
                .or_default()
                .clone();
            dependency.depend(tracker);
        }
    }

    /// Drop `(key, value)` dependencies nothing depends on any more.
    fn prune_value_deps(&self, key: &str) {
        if let Some(mut by_value) = self.inner.value_deps.get_mut(key) {
            by_value.retain(|_, dependency| dependency.has_dependents());
        }
        self.inner
            .value_deps
            .remove_if(key, |_, by_value| by_value.is_empty());
    }

    fn changed(&self, key: &str, previous: Option<&Value>, current: Option<&Value>) {
        trace!(key, "state changed");

        let key_dep = self.inner.key_deps.get(key).map(|dep| dep.value().clone());
        if let Some(dependency) = key_dep {
            dependency.changed();
        }

        let value_deps: Vec<Dependency> = self
            .inner
            .value_deps
            .get(key)
            .map(|by_value| {
                [previous, current]
                    .into_iter()
                    .flatten()
                    .filter_map(|value| by_value.value().get(&value.to_string()).cloned())
                    .collect()
            })
            .unwrap_or_default();
        for dependency in value_deps {
            dependency.changed();
        }
        self.prune_value_deps(key);

        self.inner.all_dep.changed();
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.values.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computation, Runtime};
    use serde_json::json;

    #[test]
    fn get_set_has() {
        let store = StateStore::new();
        let untracked = Tracker::untracked();

        assert!(!store.has("open", &untracked));
        assert!(store.set("open", true));
        assert_eq!(store.get("open", &untracked), Some(json!(true)));
        assert!(store.has("open", &untracked));
        assert!(!store.set("open", true));
    }

    #[test]
    fn get_depends_on_its_key_only() {
        let runtime = Runtime::new();
        let store = StateStore::new();

        let reader = store.clone();
        let computation = Computation::new(&runtime, move |tracker| {
            reader.get("a", tracker);
        });

        store.set("b", 1);
        assert!(!computation.is_invalidated());

        store.set("a", 1);
        assert!(computation.is_invalidated());
    }

    #[test]
    fn unused_equality_dependencies_are_pruned() {
        let runtime = Runtime::new();
        let store = StateStore::new();
        store.set("tab", "home");
        let tracked_values = |store: &StateStore| {
            store.inner.value_deps.get("tab").map_or(0, |by_value| by_value.len())
        };

        let reader = store.clone();
        let _home = Computation::new(&runtime, move |tracker| {
            reader.equals("tab", &json!("home"), tracker);
        });
        let reader = store.clone();
        let settings = Computation::new(&runtime, move |tracker| {
            reader.equals("tab", &json!("settings"), tracker);
        });
        assert_eq!(tracked_values(&store), 2);

        settings.stop();
        store.set("tab", "profile");
        assert_eq!(tracked_values(&store), 0);
        assert!(store.inner.value_deps.get("tab").is_none());

        runtime.flush();
        assert_eq!(tracked_values(&store), 1);
    }

    #[test]
    fn equals_only_invalidates_when_result_can_change() {
        let runtime = Runtime::new();
        let store = StateStore::new();
        store.set("tab", "home");

        let reader = store.clone();
        let computation = Computation::new(&runtime, move |tracker| {
            reader.equals("tab", &json!("settings"), tracker);
        });

        // home -> profile: "settings" is neither the old nor the new value.
        store.set("tab", "profile");
        assert!(!computation.is_invalidated());

        store.set("tab", "settings");
        assert!(computation.is_invalidated());
        runtime.flush();

        store.set("tab", "home");
        assert!(computation.is_invalidated());
    }

    #[test]
    fn delete_and_clear_invalidate_readers() {
        let runtime = Runtime::new();
        let store = StateStore::new();
        store.set("a", 1);
        store.set("b", 2);

        let reader = store.clone();
        let computation = Computation::new(&runtime, move |tracker| {
            reader.all(tracker);
        });

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert!(computation.is_invalidated());
        runtime.flush();

        store.clear();
        assert!(store.is_empty());
        assert!(computation.is_invalidated());
    }

    #[test]
    fn set_default_keeps_existing_value() {
        let store = StateStore::new();
        assert!(store.set_default("count", 1));
        assert!(!store.set_default("count", 2));
        assert_eq!(store.get("count", &Tracker::untracked()), Some(json!(1)));
        assert_eq!(store.keys(), vec!["count".to_string()]);
    }
}
