//! Lattice Component
//!
//! This crate provides the component layer for the Lattice reactive UI
//! framework. It implements:
//!
//! - Component classes and instances with data, state, methods and hooks
//! - Lifecycle management (create, materialize, render, destroy, re-create)
//! - Hierarchical lookup of components, data contexts and named capabilities
//! - Event maps that accumulate across class inheritance
//!
//! It ships the reactive substrate and view tree it runs on, kept minimal.
//!
//! # Architecture
//!
//! - `reactive`: signals, state stores, computations and the runtime
//! - `view`: view nodes, the reference renderer, mount points, event dispatch
//! - `component`: class descriptors and component entities
//! - `lookup`: ancestor walks over the view tree
//! - `events`: binding class event maps to their owning component
//! - `registry`: templates, helpers and component registration
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_component::prelude::*;
//! use serde_json::json;
//!
//! let registry = Registry::new();
//! let renderer = Renderer::new(Runtime::new(), Document::with_mount_points(["body"]));
//!
//! registry.register_template("greeting", Template::new("greeting", |view, tracker| {
//!     let name = get_data_context(view, tracker).unwrap_or_default();
//!     Ok(Content::text(format!("Hello, {}", name["name"].as_str().unwrap_or("?"))))
//! }));
//!
//! let greeter = registry.define(ComponentClass::builder("Greeter").template_name("greeting"))?;
//! let component = Component::new(&registry, &greeter, ComponentOptions::new().with_data(json!({"name": "Ada"})));
//! component.insert(&renderer, InsertOptions::default())?;
//!
//! component.set_data(json!({"name": "Grace"}));
//! renderer.flush(); // re-renders: "Hello, Grace"
//! ```

pub mod capability;
pub mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod lookup;
pub mod reactive;
pub mod registry;
pub mod template;
pub mod view;

pub use error::{ComponentError, Result};

/// Everything needed to declare, render and query components.
pub mod prelude {
    pub use crate::capability::{Invocation, Receiver, Resolved};
    pub use crate::component::{
        Component, ComponentClass, ComponentOptions, DataSource, InsertOptions, LifecycleState,
        TemplateSpec,
    };
    pub use crate::config::Config;
    pub use crate::error::{ComponentError, Result};
    pub use crate::events::{EventMap, TemplateInstance};
    pub use crate::lookup::{
        find_first_component, find_first_component_of_class, find_first_component_of_kind,
        get_data_context, get_inclusion_arguments, get_parent_data_context, lookup,
    };
    pub use crate::reactive::{Runtime, Signal, StateStore, Tracker};
    pub use crate::registry::Registry;
    pub use crate::template::Template;
    pub use crate::view::{
        dispatch_event, Content, Document, Event, Hook, Inclusion, Renderer, View,
    };
}
