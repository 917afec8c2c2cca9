//! Event Map Compiler
//!
//! A component class declares event maps keyed by `"eventName selector"`.
//! Each declaration is bound once, when it is made, so that whatever view
//! dispatches the event, the handler runs against the component that owns
//! the view the map is attached to.
//!
//! # How Binding Works
//!
//! 1. `bind_event_map` wraps every handler. The wrapper receives the view
//!    the map is attached to and resolves its owning component.
//!
//! 2. The [`TemplateInstance`] passed to the handler is captured at
//!    dispatch time, so it reflects the data and nodes of that moment.
//!
//! 3. When a component view materializes for the first time, every bound
//!    map of its class is attached to the view's dispatch table, superclass
//!    maps first.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::component::Component;
use crate::error::{ComponentError, Result};
use crate::lookup;
use crate::reactive::Tracker;
use crate::view::{CompiledEventMap, DispatchHandler, Event, RenderedNode, View};

/// A declared event handler. Receives the owning component.
pub type EventHandler =
    Arc<dyn Fn(&Component, &Event, &TemplateInstance) -> Result<()> + Send + Sync>;

/// Event handlers keyed by `"eventName selector"`.
#[derive(Clone, Default)]
pub struct EventMap {
    handlers: IndexMap<String, EventHandler>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler.
    pub fn on<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Component, &Event, &TemplateInstance) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(key.into(), Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for EventMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// An event map whose handlers are bound to the owning component.
#[derive(Clone, Debug)]
pub struct BoundEventMap {
    compiled: CompiledEventMap,
}

impl BoundEventMap {
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Bind every handler of `map` to the component owning the dispatching view.
///
/// Fails if a key names no event.
pub fn bind_event_map(map: &EventMap) -> Result<BoundEventMap> {
    let handlers: IndexMap<String, DispatchHandler> = map
        .handlers
        .iter()
        .map(|(key, handler)| {
            let handler = handler.clone();
            let key_name = key.clone();
            let bound: DispatchHandler = Arc::new(move |view: &View, event: &Event| {
                let component = view.component().ok_or_else(|| {
                    ComponentError::lookup(format!(
                        "no component owns view {:?} handling {key_name:?}",
                        view.name()
                    ))
                })?;
                let instance = TemplateInstance::capture(view);
                handler(&component, event, &instance)
            });
            (key.clone(), bound)
        })
        .collect();

    Ok(BoundEventMap {
        compiled: CompiledEventMap::compile(&handlers)?,
    })
}

/// Attach `maps` to `view`'s dispatch table in order.
pub(crate) fn attach_event_maps(view: &View, maps: &[BoundEventMap]) {
    for map in maps {
        view.add_event_map(map.compiled.clone());
    }
    if !maps.is_empty() {
        debug!(view = view.id().raw(), maps = maps.len(), "attached event maps");
    }
}

/// What an event handler sees of the view it fired on.
#[derive(Clone, Debug)]
pub struct TemplateInstance {
    view: View,
    data: Option<Value>,
    first_node: Option<RenderedNode>,
    last_node: Option<RenderedNode>,
}

impl TemplateInstance {
    /// Snapshot `view` as it is now.
    ///
    /// The data is the view's own data scope if it renders one directly,
    /// else the nearest enclosing data context.
    pub(crate) fn capture(view: &View) -> Self {
        let own_scope = view
            .children()
            .into_iter()
            .find(|child| child.is_data_scope())
            .and_then(|scope| scope.data_var().map(|var| var.get_untracked()));

        let data = match own_scope {
            Some(data) => data,
            None => lookup::get_data_context(view, &Tracker::untracked()),
        };

        Self {
            view: view.clone(),
            data,
            first_node: view.first_node(),
            last_node: view.last_node(),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Data context at dispatch time.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn first_node(&self) -> Option<&RenderedNode> {
        self.first_node.as_ref()
    }

    pub fn last_node(&self) -> Option<&RenderedNode> {
        self.last_node.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{dispatch_event, Content};

    #[test]
    fn rejects_empty_keys() {
        let map = EventMap::new().on(" ", |_, _, _| Ok(()));
        assert!(matches!(
            bind_event_map(&map),
            Err(ComponentError::Precondition(_))
        ));
    }

    #[test]
    fn handler_needs_an_owning_component() {
        let map = EventMap::new().on("click", |_, _, _| Ok(()));
        let bound = bind_event_map(&map).unwrap();
        assert_eq!(bound.len(), 1);

        let view = View::new("orphan", |_, _| Ok(Content::Empty));
        attach_event_maps(&view, &[bound]);
        assert_eq!(view.event_map_count(), 1);

        let err = dispatch_event(&view, &Event::new("click")).unwrap_err();
        assert!(matches!(err, ComponentError::Lookup(_)));
    }

    #[test]
    fn template_instance_reads_enclosing_data() {
        let scope = View::with_value(serde_json::json!({"n": 1}), |_, _| Ok(Content::Empty));
        scope.data_var().unwrap().set(Some(serde_json::json!({"n": 1})));
        let inner = View::new("inner", |_, _| Ok(Content::Empty));
        inner.set_parent(&scope);

        let instance = TemplateInstance::capture(&inner);
        assert_eq!(instance.data(), Some(&serde_json::json!({"n": 1})));
        assert_eq!(instance.view(), &inner);
        assert!(instance.first_node().is_none());
    }
}
