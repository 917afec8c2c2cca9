//! Reactive Runtime
//!
//! The runtime is the scheduler that connects invalidation to re-execution.
//! Writes never run dependents synchronously; they only queue them here.
//!
//! # How It Works
//!
//! 1. A write calls `changed()` on a dependency.
//!
//! 2. Each dependent computation is marked invalidated and pushed onto the
//!    runtime's queue (at most once until it runs again).
//!
//! 3. [`Runtime::flush`] drains the queue in invalidation order and re-runs
//!    every computation that is still invalidated and not stopped.
//!
//! 4. Re-runs may invalidate further computations (a data scope feeding a
//!    template, for example); those are handled in a following pass of the
//!    same flush, up to the configured pass limit.
//!
//! There is no global runtime. Each application constructs one and hands
//! it to the renderer, so tests can run side by side without sharing state.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::computation::Computation;

/// Default bound on flush passes.
const DEFAULT_MAX_PASSES: usize = 100;

/// Handle to a reactive scheduler.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    queue: Mutex<VecDeque<Computation>>,
    flushing: AtomicBool,
    max_passes: usize,
}

/// Resets the flushing flag even if a computation panics.
struct FlushGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Runtime {
    /// Create a runtime with the default pass limit.
    pub fn new() -> Self {
        Self::with_max_passes(DEFAULT_MAX_PASSES)
    }

    /// Create a runtime that stops flushing after `max_passes` passes.
    pub fn with_max_passes(max_passes: usize) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                queue: Mutex::new(VecDeque::new()),
                flushing: AtomicBool::new(false),
                max_passes: max_passes.max(1),
            }),
        }
    }

    /// Queue an invalidated computation.
    pub(crate) fn enqueue(&self, computation: Computation) {
        self.inner.queue.lock().push_back(computation);
    }

    /// Number of queued computations.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Check if any computation is waiting to re-run.
    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Re-run every invalidated computation.
    ///
    /// Returns the number of computations that ran. A flush requested from
    /// inside a running flush returns 0; the outer flush picks up the work.
    ///
    /// Once the pass limit is reached the remaining computations stay
    /// queued and invalidated: [`pending`](Self::pending) reports them and
    /// the next flush runs them.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let _guard = FlushGuard {
            flag: &self.inner.flushing,
        };

        let mut runs = 0;
        let mut passes = 0;

        loop {
            let batch: Vec<Computation> = self.inner.queue.lock().drain(..).collect();
            if batch.is_empty() {
                break;
            }

            passes += 1;
            if passes > self.inner.max_passes {
                warn!(
                    max_passes = self.inner.max_passes,
                    deferred = batch.len(),
                    "flush pass limit reached, deferring pending computations"
                );
                let mut queue = self.inner.queue.lock();
                for computation in batch.into_iter().rev() {
                    queue.push_front(computation);
                }
                break;
            }

            for computation in batch {
                if computation.is_stopped() || !computation.is_invalidated() {
                    continue;
                }
                computation.execute();
                runs += 1;
            }
        }

        if runs > 0 {
            debug!(runs, passes, "flushed reactive runtime");
        }
        runs
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pending", &self.pending())
            .field("max_passes", &self.inner.max_passes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn flush_on_empty_queue_runs_nothing() {
        let runtime = Runtime::new();
        assert_eq!(runtime.flush(), 0);
        assert!(!runtime.has_pending());
    }

    #[test]
    fn flush_follows_cascading_invalidations() {
        let runtime = Runtime::new();
        let source = Signal::new(1);
        let derived = Signal::new(0);
        let observed = Arc::new(AtomicI32::new(0));

        let (src, dst) = (source.clone(), derived.clone());
        let _copy = Computation::new(&runtime, move |tracker| {
            dst.set(src.get(tracker) * 10);
        });

        let (reader, out) = (derived.clone(), observed.clone());
        let _observe = Computation::new(&runtime, move |tracker| {
            out.store(reader.get(tracker), Ordering::SeqCst);
        });
        assert_eq!(observed.load(Ordering::SeqCst), 10);

        source.set(4);
        assert_eq!(observed.load(Ordering::SeqCst), 10);

        assert_eq!(runtime.flush(), 2);
        assert_eq!(observed.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn flush_defers_runaway_computations() {
        let runtime = Runtime::with_max_passes(3);
        let counter = Signal::new(0);

        let signal = counter.clone();
        let computation = Computation::new(&runtime, move |tracker| {
            let value = signal.get(tracker);
            signal.set(value + 1);
        });
        assert_eq!(counter.get_untracked(), 1);

        assert_eq!(runtime.flush(), 3);
        assert!(!computation.is_stopped());
        assert!(computation.is_invalidated());
        assert_eq!(runtime.pending(), 1);
        assert_eq!(counter.get_untracked(), 4);

        assert_eq!(runtime.flush(), 3);
        assert_eq!(counter.get_untracked(), 7);

        computation.stop();
        assert_eq!(runtime.flush(), 0);
        assert!(!runtime.has_pending());
    }
}
