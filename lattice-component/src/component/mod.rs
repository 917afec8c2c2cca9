//! Components
//!
//! Reusable units of UI behavior: a class descriptor declares templates,
//! capabilities and event maps; an entity is one live instance bound to at
//! most one view.

mod class;
mod entity;

pub use class::{ComponentClass, ComponentClassBuilder, ComponentRenderFn, InitFn, TemplateSpec};
pub use entity::{
    Component, ComponentOptions, DataSource, HookFn, InsertOptions, LazyData, LifecycleState,
    WeakComponent,
};
