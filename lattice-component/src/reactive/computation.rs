//! Computation Implementation
//!
//! A Computation is a re-runnable closure whose reactive reads are tracked.
//! Render passes and data-scope functions are computations.
//!
//! # How Computations Work
//!
//! 1. Running the closure hands it a [`Tracker`] for this computation;
//!    every value read through that tracker records a dependency.
//!
//! 2. When any dependency changes, the computation is invalidated and
//!    queued on its [`Runtime`]. It does not re-run synchronously.
//!
//! 3. Invalidating an already-invalidated computation is a no-op, so any
//!    number of writes before the next flush cost a single re-run.
//!
//! 4. Before re-running, the computation forgets its old dependencies and
//!    tracks new ones during execution.
//!
//! # Stopping
//!
//! A stopped computation never runs again, even if it was already queued.
//! Tearing down a view stops its computations, which is what keeps a pending
//! re-render from touching a destroyed view.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::context::Tracker;
use super::dependency::Dependency;
use super::runtime::Runtime;
use super::subscriber::SubscriberId;

type RunFn = dyn Fn(&Tracker) + Send + Sync;

/// A tracked, re-runnable computation.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(0);
///
/// let reader = count.clone();
/// let computation = Computation::new(&runtime, move |tracker| {
///     println!("Count is: {}", reader.get(tracker));
/// });
///
/// count.set(5);
/// runtime.flush(); // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Computation {
    inner: Arc<ComputationInner>,
}

struct ComputationInner {
    /// The subscriber ID used for dependency tracking.
    subscriber_id: SubscriberId,

    /// The tracked function.
    run: Box<RunFn>,

    /// The runtime this computation is queued on when invalidated.
    runtime: Runtime,

    /// Dependencies registered during the last run.
    sources: Mutex<Vec<Dependency>>,

    invalidated: AtomicBool,
    stopped: AtomicBool,
    run_count: AtomicUsize,
}

/// Non-owning handle held by dependencies.
#[derive(Clone)]
pub(crate) struct WeakComputation(Weak<ComputationInner>);

impl WeakComputation {
    pub(crate) fn upgrade(&self) -> Option<Computation> {
        self.0.upgrade().map(|inner| Computation { inner })
    }
}

impl Computation {
    /// Create a computation and run it immediately to establish its
    /// initial dependencies.
    pub fn new<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn(&Tracker) + Send + Sync + 'static,
    {
        let computation = Self::new_lazy(runtime, run);
        computation.execute();
        computation
    }

    /// Create a computation without running it.
    pub fn new_lazy<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn(&Tracker) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ComputationInner {
                subscriber_id: SubscriberId::new(),
                run: Box::new(run),
                runtime: runtime.clone(),
                sources: Mutex::new(Vec::new()),
                invalidated: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the subscriber ID for this computation.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Run the tracked function.
    pub fn execute(&self) {
        if self.is_stopped() {
            return;
        }

        self.inner.invalidated.store(false, Ordering::SeqCst);
        self.clear_sources();

        let tracker = Tracker::for_computation(self.clone());
        (self.inner.run)(&tracker);

        self.inner.run_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark the computation as needing a re-run and queue it.
    ///
    /// Returns `false` if it was already invalidated or is stopped.
    pub fn invalidate(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        if self.inner.invalidated.swap(true, Ordering::SeqCst) {
            return false;
        }

        trace!(subscriber = self.inner.subscriber_id.raw(), "computation invalidated");
        self.inner.runtime.enqueue(self.clone());
        true
    }

    /// Stop the computation. It will not run again.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            self.clear_sources();
        }
    }

    /// Check if the computation has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Check if a re-run is pending.
    pub fn is_invalidated(&self) -> bool {
        self.inner.invalidated.load(Ordering::SeqCst)
    }

    /// Get the number of times the computation has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies registered during the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.sources.lock().len()
    }

    pub(crate) fn add_source(&self, dependency: Dependency) {
        self.inner.sources.lock().push(dependency);
    }

    pub(crate) fn downgrade(&self) -> WeakComputation {
        WeakComputation(Arc::downgrade(&self.inner))
    }

    fn clear_sources(&self) {
        let sources = std::mem::take(&mut *self.inner.sources.lock());
        for dependency in sources {
            dependency.forget(self.inner.subscriber_id);
        }
    }
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("invalidated", &self.is_invalidated())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
