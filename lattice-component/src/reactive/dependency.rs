//! Dependency
//!
//! A `Dependency` is the invalidation half of a reactive value: reading the
//! value calls [`Dependency::depend`], writing it calls
//! [`Dependency::changed`]. Signals and the state store are built from it.
//!
//! Dependents are held weakly. A computation that has been dropped simply
//! stops receiving invalidations.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::computation::WeakComputation;
use super::context::Tracker;
use super::SubscriberId;

/// Counter for generating unique dependency IDs.
static DEPENDENCY_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A set of computations to invalidate when a value changes.
#[derive(Clone)]
pub struct Dependency {
    inner: Arc<DependencyInner>,
}

struct DependencyInner {
    id: u64,
    dependents: Mutex<IndexMap<SubscriberId, WeakComputation>>,
    changes: AtomicUsize,
}

impl Dependency {
    /// Create a dependency with no dependents.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DependencyInner {
                id: DEPENDENCY_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                dependents: Mutex::new(IndexMap::new()),
                changes: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the dependency's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Register the tracker's computation as a dependent.
    ///
    /// Returns `true` if a new dependent was added.
    pub fn depend(&self, tracker: &Tracker) -> bool {
        let Some(computation) = tracker.computation() else {
            return false;
        };
        if computation.is_stopped() {
            return false;
        }

        let added = self
            .inner
            .dependents
            .lock()
            .insert(computation.subscriber_id(), computation.downgrade())
            .is_none();

        if added {
            computation.add_source(self.clone());
        }
        added
    }

    /// Invalidate every dependent.
    ///
    /// Dependents are forgotten; a computation that reads the value again
    /// during its re-run registers itself again. Returns the number of
    /// computations that were newly invalidated.
    pub fn changed(&self) -> usize {
        self.inner.changes.fetch_add(1, Ordering::Relaxed);

        let dependents: Vec<WeakComputation> = self
            .inner
            .dependents
            .lock()
            .drain(..)
            .map(|(_, computation)| computation)
            .collect();

        let invalidated = dependents
            .into_iter()
            .filter_map(|weak| weak.upgrade())
            .filter(|computation| computation.invalidate())
            .count();

        trace!(dependency = self.inner.id, invalidated, "dependency changed");
        invalidated
    }

    /// Check if any computation depends on this value.
    pub fn has_dependents(&self) -> bool {
        !self.inner.dependents.lock().is_empty()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.lock().len()
    }

    /// Number of times [`changed`](Self::changed) has been called.
    pub fn change_count(&self) -> usize {
        self.inner.changes.load(Ordering::Relaxed)
    }

    /// Drop a dependent without invalidating it.
    pub(crate) fn forget(&self, subscriber_id: SubscriberId) {
        self.inner.dependents.lock().shift_remove(&subscriber_id);
    }
}

impl Default for Dependency {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.inner.id)
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
