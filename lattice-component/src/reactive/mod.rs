//! Reactive Primitives
//!
//! The reactive substrate the component layer is built on: a single-slot
//! cell, a key-value store, and the computations that re-run when either
//! changes.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] holds one value. Reading it through an active [`Tracker`]
//! registers the running computation as a dependent; writing a different
//! value invalidates every dependent. Writing an equal value does nothing.
//!
//! ## State Stores
//!
//! A [`StateStore`] holds many values by key, with per-key dependencies
//! and an `equals` read that only depends on whether a key matches a value.
//!
//! ## Computations
//!
//! A [`Computation`] is a tracked closure. Invalidation queues it on its
//! [`Runtime`]; [`Runtime::flush`] re-runs the queue. Nothing re-runs
//! synchronously on write.
//!
//! # Implementation Notes
//!
//! Dependency tracking is explicit: every read takes a `&Tracker`. This is
//! the handle the lookup walks thread through the view tree, so a walk that
//! reads a data scope registers the dependency on exactly the computation
//! that asked.

mod computation;
mod context;
mod dependency;
mod runtime;
mod signal;
mod store;
mod subscriber;

pub use computation::Computation;
pub use context::Tracker;
pub use dependency::Dependency;
pub use runtime::Runtime;
pub use signal::Signal;
pub use store::StateStore;
pub use subscriber::SubscriberId;
