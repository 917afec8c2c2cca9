//! Reactive Context
//!
//! A [`Tracker`] names the computation that is currently running, if any.
//! Every reactive read takes one explicitly: reading a signal through a
//! tracker that carries a computation registers that computation as a
//! dependent, reading through [`Tracker::untracked`] registers nothing.
//!
//! Passing the tracker by hand (instead of consulting a thread-local stack)
//! keeps the ancestor walks in [`crate::lookup`] testable without a live
//! render pass: a test can hand in an untracked tracker, or a tracker for a
//! computation it owns and then inspect what was registered.

use std::fmt;

use super::computation::Computation;
use super::SubscriberId;

/// Dependency-registration handle for the current computation.
#[derive(Clone, Default)]
pub struct Tracker {
    computation: Option<Computation>,
}

impl Tracker {
    /// A tracker that registers no dependencies.
    pub fn untracked() -> Self {
        Self { computation: None }
    }

    /// A tracker that registers dependencies on `computation`.
    pub(crate) fn for_computation(computation: Computation) -> Self {
        Self {
            computation: Some(computation),
        }
    }

    /// Check if reads through this tracker create dependencies.
    pub fn is_active(&self) -> bool {
        self.computation
            .as_ref()
            .is_some_and(|computation| !computation.is_stopped())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber(&self) -> Option<SubscriberId> {
        self.computation.as_ref().map(Computation::subscriber_id)
    }

    pub(crate) fn computation(&self) -> Option<&Computation> {
        self.computation.as_ref()
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("subscriber", &self.current_subscriber())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn untracked_is_inactive() {
        let tracker = Tracker::untracked();
        assert!(!tracker.is_active());
        assert!(tracker.current_subscriber().is_none());
    }

    #[test]
    fn computation_tracker_reports_subscriber() {
        let runtime = Runtime::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let computation = Computation::new(&runtime, move |tracker| {
            *seen_clone.lock() = tracker.current_subscriber();
        });

        assert_eq!(*seen.lock(), Some(computation.subscriber_id()));
    }

    #[test]
    fn stopped_computation_tracker_is_inactive() {
        let runtime = Runtime::new();
        let computation = Computation::new_lazy(&runtime, |_| {});
        let tracker = Tracker::for_computation(computation.clone());
        assert!(tracker.is_active());

        computation.stop();
        assert!(!tracker.is_active());
    }
}
