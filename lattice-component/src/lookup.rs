//! Lookup & Resolution
//!
//! Walks from a view up to the root to answer "which component owns this",
//! "what data is in scope here" and "what does this name resolve to".
//!
//! # How a Walk Works
//!
//! Every function starts at the given view and follows parent links. The
//! first view that answers wins, so a nearer ancestor always shadows a
//! farther one. Nothing is cached: the tree and its data change between
//! calls, and every walk is O(depth).
//!
//! Reads of data scopes go through the caller's [`Tracker`], so a render
//! pass that asks for its data context depends on exactly the scope that
//! answered.

use serde_json::Value;
use tracing::trace;

use crate::capability::{BoundFunction, Capability, Receiver, Resolved};
use crate::component::{Component, ComponentClass};
use crate::error::{ComponentError, Result};
use crate::reactive::Tracker;
use crate::view::{TemplateSlot, View};

/// Nearest component whose view is tagged `kind`.
///
/// Fails if `kind` is empty.
pub fn find_first_component_of_kind(kind: &str, view: &View) -> Result<Option<Component>> {
    if kind.is_empty() {
        return Err(ComponentError::precondition("kind must be a non-empty string"));
    }
    Ok(view
        .ancestors()
        .filter(|ancestor| ancestor.kind_tag() == Some(kind))
        .find_map(|ancestor| ancestor.component()))
}

/// Nearest component that is an instance of `class` or one of its subclasses.
pub fn find_first_component_of_class(class: &ComponentClass, view: &View) -> Option<Component> {
    view.ancestors()
        .filter_map(|ancestor| ancestor.component())
        .find(|component| component.class().is_subclass_of(class))
}

/// Nearest component of any class.
pub fn find_first_component(view: &View) -> Option<Component> {
    view.ancestors().find_map(|ancestor| ancestor.component())
}

/// Value of the nearest data scope, skipping argument scopes.
///
/// Depends, through `tracker`, on the scope that answered.
pub fn get_data_context(view: &View, tracker: &Tracker) -> Option<Value> {
    view.ancestors()
        .find(View::is_data_scope)
        .and_then(|scope| scope.data_var().and_then(|var| var.get(tracker)))
}

/// Data context above `view`, so a view's own scope does not answer.
pub fn get_parent_data_context(view: &View, tracker: &Tracker) -> Option<Value> {
    view.parent()
        .and_then(|parent| get_data_context(&parent, tracker))
}

/// Arguments bound where `view` was included, if its parent binds any.
pub fn get_inclusion_arguments(view: &View, tracker: &Tracker) -> Option<Value> {
    view.parent()
        .filter(View::is_argument_scope)
        .and_then(|scope| scope.data_var().and_then(|var| var.get(tracker)))
}

/// Resolve `name` on the nearest view whose template or component declares it.
///
/// On a component view the component's table answers, so its methods win
/// over its static properties. Functions come back bound to the component
/// or template that declared them.
pub fn lookup(view: &View, name: &str) -> Option<Resolved> {
    for (depth, ancestor) in view.ancestors().enumerate() {
        let found = match ancestor.template_slot() {
            Some(TemplateSlot::Component(weak)) => weak.upgrade().and_then(|component| {
                component
                    .class()
                    .capabilities()
                    .resolve(name)
                    .map(|capability| bind(capability, Receiver::Component(component)))
            }),
            Some(TemplateSlot::Template(template)) => template
                .capabilities()
                .resolve(name)
                .map(|capability| bind(capability, Receiver::Template(template.clone()))),
            None => None,
        };

        if found.is_some() {
            trace!(name, depth, view = ancestor.name(), "lookup resolved");
            return found;
        }
    }

    trace!(name, from = view.name(), "lookup exhausted");
    None
}

fn bind(capability: Capability, receiver: Receiver) -> Resolved {
    match capability {
        Capability::Method(callable) | Capability::Helper(callable) => {
            Resolved::Function(BoundFunction::new(callable, receiver))
        }
        Capability::Property(value) => Resolved::Value(value),
    }
}

// ---- Tests ----
