//! Signal Implementation
//!
//! A Signal is the single-slot reactive cell. It holds a value and tracks
//! which computations read it.
//!
//! # How Signals Work
//!
//! 1. Reading through an active [`Tracker`] registers the tracker's
//!    computation as a dependent.
//!
//! 2. Writing a value that differs from the stored one invalidates every
//!    dependent. Writing an equal value is a no-op: nothing is invalidated
//!    and nothing re-runs.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique ID (8 bytes)
//! - The value (behind `Arc<RwLock<_>>`, shared by clones)
//! - A [`Dependency`] holding weak references to its readers

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::Tracker;
use super::dependency::Dependency;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive cell holding a value of type T.
///
/// # Type Parameters
///
/// - `T`: The stored value. `PartialEq` is what makes equal writes free.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value, registering a dependency if the tracker is active
/// let value = count.get(&tracker);
///
/// // Update the value (invalidates readers)
/// assert!(count.set(5));
/// assert!(!count.set(5));
/// ```
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Readers to invalidate on change.
    dependency: Dependency,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            dependency: Dependency::new(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value, registering a dependency on `tracker`.
    pub fn get(&self, tracker: &Tracker) -> T {
        self.dependency.depend(tracker);
        self.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Read the value by reference, registering a dependency on `tracker`.
    pub fn with<R>(&self, tracker: &Tracker, f: impl FnOnce(&T) -> R) -> R {
        self.dependency.depend(tracker);
        f(&self.value.read())
    }

    /// Store a new value.
    ///
    /// Returns `true` if the value changed and readers were invalidated.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
        }

        self.dependency.changed();
        true
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value)
    }

    /// Get the number of computations reading this signal.
    pub fn subscriber_count(&self) -> usize {
        self.dependency.dependent_count()
    }

    /// Number of writes that actually changed the value.
    pub fn change_count(&self) -> usize {
        self.dependency.change_count()
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            dependency: self.dependency.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computation, Runtime};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(&Tracker::untracked()), 0);

        assert!(signal.set(42));
        assert_eq!(signal.get_untracked(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get_untracked(), 15);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let runtime = Runtime::new();
        let signal = Signal::new(String::from("a"));

        let reader = signal.clone();
        let computation = Computation::new(&runtime, move |tracker| {
            reader.get(tracker);
        });

        assert!(!signal.set("a".to_string()));
        assert_eq!(signal.change_count(), 0);
        assert!(!runtime.has_pending());

        assert!(signal.set("b".to_string()));
        assert!(!signal.set("b".to_string()));
        assert_eq!(runtime.flush(), 1);
        assert_eq!(computation.run_count(), 2);
    }

    #[test]
    fn untracked_read_registers_nothing() {
        let runtime = Runtime::new();
        let signal = Signal::new(1);

        let reader = signal.clone();
        let _computation = Computation::new(&runtime, move |_| {
            reader.get_untracked();
        });

        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get_untracked(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }
}
