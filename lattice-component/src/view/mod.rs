//! View Tree
//!
//! The render-tree primitive the component layer is built on, and a small
//! reference renderer that drives it.
//!
//! - [`View`]: a node with a render function, a weak parent link and
//!   lifecycle callbacks.
//! - [`Content`]: what a render function returns.
//! - [`Renderer`]: runs render passes as reactive computations.
//! - [`Document`]: named mount points rendered views attach to.
//! - [`dispatch_event`]: delivers events up the tree.

mod content;
mod dispatch;
mod document;
mod node;
mod renderer;

pub use content::{Content, Inclusion};
pub use dispatch::{dispatch_event, CompiledEventMap, DispatchHandler, Event, EventSelector};
pub use document::{Document, MountPoint, Range};
pub use node::{
    Ancestors, DataFn, Hook, LifecycleCallback, RenderFn, RenderedNode, TemplateSlot, View,
    ViewId, ViewKind, WeakView,
};
pub use renderer::Renderer;

pub(crate) use node::Child;
