//! Event dispatch table.
//!
//! Each view carries a list of compiled event maps. Dispatching an event
//! walks from the target view to the root (bubbling) and runs every handler
//! whose key matches, in the order the maps were attached.
//!
//! An event map key is `"eventName selector"`; the selector is optional and
//! several pairs may be joined with commas: `"click .save, keyup input"`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::error::{ComponentError, Result};

use super::node::View;

/// Handler in a view's dispatch table; receives the view the map is attached to.
pub type DispatchHandler = Arc<dyn Fn(&View, &Event) -> Result<()> + Send + Sync>;

/// An event delivered to the view tree.
#[derive(Debug, Default)]
pub struct Event {
    name: String,
    target: Option<String>,
    payload: Value,
    propagation_stopped: AtomicBool,
    default_prevented: AtomicBool,
}

impl Event {
    /// An event of type `name` with no target selector.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the selector the event target matches.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Event type, e.g. `"click"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selector of the event target.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Event payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Stop bubbling after the current view's handlers.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
    }

    /// Check if bubbling was stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::SeqCst)
    }

    /// Mark the default action as prevented.
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    /// Check if the default action was prevented.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }
}

/// One `"eventName selector"` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSelector {
    event: String,
    selector: Option<String>,
}

impl EventSelector {
    /// Parse a map key into its selectors.
    pub fn parse(key: &str) -> Result<Vec<EventSelector>> {
        let selectors: Vec<EventSelector> = key
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(char::is_whitespace) {
                Some((event, selector)) => EventSelector {
                    event: event.to_string(),
                    selector: Some(selector.trim().to_string()),
                },
                None => EventSelector {
                    event: part.to_string(),
                    selector: None,
                },
            })
            .collect();

        if selectors.is_empty() {
            return Err(ComponentError::precondition(format!(
                "event map key {key:?} names no event"
            )));
        }
        Ok(selectors)
    }

    /// Event type.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Target selector, if any.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Check if `event` is handled by this selector.
    pub fn matches(&self, event: &Event) -> bool {
        self.event == event.name()
            && self
                .selector
                .as_deref()
                .map_or(true, |selector| event.target() == Some(selector))
    }
}

/// An event map compiled into a view's dispatch table.
#[derive(Clone, Default)]
pub struct CompiledEventMap {
    entries: Vec<(Vec<EventSelector>, DispatchHandler)>,
}

impl CompiledEventMap {
    /// Compile handlers keyed by `"eventName selector"`.
    pub fn compile(handlers: &IndexMap<String, DispatchHandler>) -> Result<Self> {
        let entries = handlers
            .iter()
            .map(|(key, handler)| Ok((EventSelector::parse(key)?, handler.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no handlers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn handlers_for<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a DispatchHandler> {
        self.entries
            .iter()
            .filter(move |(selectors, _)| selectors.iter().any(|s| s.matches(event)))
            .map(|(_, handler)| handler)
    }
}

impl fmt::Debug for CompiledEventMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(selectors, _)| selectors))
            .finish()
    }
}

/// Deliver `event` to `target` and its ancestors.
///
/// Returns the number of handlers that ran. The first handler error aborts
/// dispatch and is returned.
pub fn dispatch_event(target: &View, event: &Event) -> Result<usize> {
    let mut handled = 0;

    for view in target.ancestors() {
        if view.is_destroyed() {
            continue;
        }
        for map in view.event_maps() {
            for handler in map.handlers_for(event) {
                handler(&view, event)?;
                handled += 1;
            }
        }
        if event.is_propagation_stopped() {
            break;
        }
    }

    trace!(event = event.name(), target = target.id().raw(), handled, "dispatched event");
    Ok(handled)
}
