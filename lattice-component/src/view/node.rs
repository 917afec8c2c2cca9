//! View Nodes
//!
//! A [`View`] is one node of the render tree: a render function, a weak
//! link to its parent, the children produced by its last render pass, and
//! the lifecycle callbacks the renderer fires on it.
//!
//! Views are cheap-clone handles. Parents own their children; a child only
//! holds a weak reference back up, and the component back-reference is
//! non-owning too.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use smallvec::SmallVec;

use crate::component::{Component, WeakComponent};
use crate::error::{ComponentError, Result};
use crate::reactive::{Computation, Signal, Tracker};
use crate::template::Template;

use super::content::Content;
use super::dispatch::CompiledEventMap;
use super::document::MountPoint;

/// Render function of a view.
pub type RenderFn = dyn Fn(&View, &Tracker) -> Result<Content> + Send + Sync;

/// Data function of a data scope.
pub type DataFn = dyn Fn(&Tracker) -> Result<Option<Value>> + Send + Sync;

/// Callback fired on a lifecycle notification.
pub type LifecycleCallback = Arc<dyn Fn(&View) + Send + Sync>;

/// Unique identifier for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Lifecycle notifications, in happy-path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Created,
    Materialized,
    Rendered,
    Destroyed,
}

impl Hook {
    /// Every hook, in firing order.
    pub const ALL: [Hook; 4] = [
        Hook::Created,
        Hook::Materialized,
        Hook::Rendered,
        Hook::Destroyed,
    ];

    /// Registration name of the hook.
    pub fn name(&self) -> &'static str {
        match self {
            Hook::Created => "onCreated",
            Hook::Materialized => "onMaterialized",
            Hook::Rendered => "onRendered",
            Hook::Destroyed => "onDestroyed",
        }
    }
}

/// What kind of node a view is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    /// The view owned by a component; `kind` is the component class name.
    Component { kind: String },
    /// A data scope.
    With,
    /// A synthetic data scope binding inclusion arguments.
    TemplateWith,
    /// A view rendering a named template.
    Template { name: String },
    /// Anything else.
    Plain,
}

/// What a view consults during a lookup walk.
#[derive(Clone)]
pub enum TemplateSlot {
    Component(WeakComponent),
    Template(Template),
}

/// A rendered node, as seen by event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedNode {
    Text(String),
    View(ViewId),
}

/// A child view produced by a render pass.
#[derive(Clone)]
pub(crate) struct Child {
    pub(crate) view: View,
    /// Set when the child view belongs to a component the parent instantiated.
    pub(crate) owner: Option<Component>,
}

/// Handle to a render tree node.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

/// Non-owning view handle.
#[derive(Clone)]
pub struct WeakView(Weak<ViewInner>);

impl WeakView {
    /// Upgrade to a view handle if the view is still alive.
    pub fn upgrade(&self) -> Option<View> {
        self.0.upgrade().map(|inner| View { inner })
    }
}

struct ViewInner {
    id: ViewId,
    name: String,
    kind: ViewKind,
    render: Option<Arc<RenderFn>>,
    data_source: Option<Arc<DataFn>>,
    data_var: Option<Signal<Option<Value>>>,

    parent: RwLock<Option<WeakView>>,
    children: Mutex<Vec<Child>>,
    nodes: RwLock<Vec<RenderedNode>>,

    component: RwLock<Option<WeakComponent>>,
    template: RwLock<Option<TemplateSlot>>,
    content_block: RwLock<Option<Template>>,
    else_block: RwLock<Option<Template>>,

    callbacks: Mutex<IndexMap<Hook, SmallVec<[LifecycleCallback; 2]>>>,
    event_maps: RwLock<Vec<CompiledEventMap>>,
    materializations: AtomicUsize,

    computations: Mutex<Vec<Computation>>,
    mount: Mutex<Option<MountPoint>>,
    last_error: Mutex<Option<ComponentError>>,

    created: AtomicBool,
    rendered: AtomicBool,
    destroyed: AtomicBool,
}

impl View {
    fn build(
        name: impl Into<String>,
        kind: ViewKind,
        render: Option<Arc<RenderFn>>,
        data_source: Option<Arc<DataFn>>,
    ) -> Self {
        let data_var = data_source.as_ref().map(|_| Signal::new(None));
        Self {
            inner: Arc::new(ViewInner {
                id: ViewId::next(),
                name: name.into(),
                kind,
                render,
                data_source,
                data_var,
                parent: RwLock::new(None),
                children: Mutex::new(Vec::new()),
                nodes: RwLock::new(Vec::new()),
                component: RwLock::new(None),
                template: RwLock::new(None),
                content_block: RwLock::new(None),
                else_block: RwLock::new(None),
                callbacks: Mutex::new(IndexMap::new()),
                event_maps: RwLock::new(Vec::new()),
                materializations: AtomicUsize::new(0),
                computations: Mutex::new(Vec::new()),
                mount: Mutex::new(None),
                last_error: Mutex::new(None),
                created: AtomicBool::new(false),
                rendered: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Create a plain view from a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Self::build(name, ViewKind::Plain, Some(Arc::new(render)), None)
    }

    /// Create a view of the given kind.
    pub fn with_kind<F>(kind: ViewKind, name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Self::build(name, kind, Some(Arc::new(render)), None)
    }

    /// Create a data scope.
    ///
    /// `data` runs in its own computation; its result is stored in the
    /// scope's reactive data variable, which descendants read through
    /// [`crate::lookup::get_data_context`].
    pub fn with_data<D, F>(data: D, content: F) -> Self
    where
        D: Fn(&Tracker) -> Result<Option<Value>> + Send + Sync + 'static,
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Self::build(
            "with",
            ViewKind::With,
            Some(Arc::new(content)),
            Some(Arc::new(data)),
        )
    }

    /// Create a data scope holding a fixed value.
    pub fn with_value<F>(value: Value, content: F) -> Self
    where
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Self::with_data(move |_| Ok(Some(value.clone())), content)
    }

    /// Create a synthetic argument-binding scope.
    pub(crate) fn template_with(args: Arc<DataFn>, content: Arc<RenderFn>) -> Self {
        Self::build("with", ViewKind::TemplateWith, Some(content), Some(args))
    }

    /// Create a view rendering `template`.
    pub fn for_template(template: &Template) -> Self {
        let view = Self::build(
            format!("Template.{}", template.name()),
            ViewKind::Template {
                name: template.name().to_string(),
            },
            Some(template.render_fn()),
            None,
        );
        view.set_template(TemplateSlot::Template(template.clone()));
        view
    }

    /// Get the view's unique ID.
    pub fn id(&self) -> ViewId {
        self.inner.id
    }

    /// Get the view's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the view's kind.
    pub fn kind(&self) -> &ViewKind {
        &self.inner.kind
    }

    /// Kind tag of a component view.
    pub fn kind_tag(&self) -> Option<&str> {
        match &self.inner.kind {
            ViewKind::Component { kind } => Some(kind),
            _ => None,
        }
    }

    /// Check if this view is a data scope.
    pub fn is_data_scope(&self) -> bool {
        self.inner.kind == ViewKind::With
    }

    /// Check if this view binds inclusion arguments.
    pub fn is_argument_scope(&self) -> bool {
        self.inner.kind == ViewKind::TemplateWith
    }

    /// Reactive data variable of a data or argument scope.
    pub fn data_var(&self) -> Option<&Signal<Option<Value>>> {
        self.inner.data_var.as_ref()
    }

    /// Get the parent view, if it is still alive.
    pub fn parent(&self) -> Option<View> {
        self.inner
            .parent
            .read()
            .as_ref()
            .and_then(WeakView::upgrade)
    }

    /// Link this view under `parent`.
    pub fn set_parent(&self, parent: &View) {
        *self.inner.parent.write() = Some(parent.downgrade());
    }

    /// Iterate from this view up to the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// Depth of this view (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Child views produced by the last render pass.
    pub fn children(&self) -> Vec<View> {
        self.inner
            .children
            .lock()
            .iter()
            .map(|child| child.view.clone())
            .collect()
    }

    /// Component owning this view, if any.
    pub fn component(&self) -> Option<Component> {
        self.inner
            .component
            .read()
            .as_ref()
            .and_then(WeakComponent::upgrade)
    }

    pub(crate) fn set_component(&self, component: WeakComponent) {
        *self.inner.component.write() = Some(component);
    }

    pub(crate) fn clear_component(&self) {
        *self.inner.component.write() = None;
        let mut template = self.inner.template.write();
        if matches!(*template, Some(TemplateSlot::Component(_))) {
            *template = None;
        }
    }

    /// What lookups consult on this view.
    pub fn template_slot(&self) -> Option<TemplateSlot> {
        self.inner.template.read().clone()
    }

    pub(crate) fn set_template(&self, slot: TemplateSlot) {
        *self.inner.template.write() = Some(slot);
    }

    /// Block content passed where this view's template was included.
    pub fn content_block(&self) -> Option<Template> {
        self.inner.content_block.read().clone()
    }

    /// Else-block content passed where this view's template was included.
    pub fn else_block(&self) -> Option<Template> {
        self.inner.else_block.read().clone()
    }

    pub(crate) fn set_blocks(&self, content: Option<Template>, else_content: Option<Template>) {
        *self.inner.content_block.write() = content;
        *self.inner.else_block.write() = else_content;
    }

    /// Register a lifecycle callback.
    pub fn on<F>(&self, hook: Hook, callback: F) -> &Self
    where
        F: Fn(&View) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .lock()
            .entry(hook)
            .or_default()
            .push(Arc::new(callback));
        self
    }

    /// Fire a lifecycle notification.
    ///
    /// Callbacks are snapshotted first, so a callback may register more
    /// callbacks; those fire on the next occurrence.
    pub(crate) fn fire(&self, hook: Hook) {
        if hook == Hook::Materialized {
            self.inner.materializations.fetch_add(1, Ordering::SeqCst);
        }
        let callbacks: SmallVec<[LifecycleCallback; 2]> = self
            .inner
            .callbacks
            .lock()
            .get(&hook)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(self);
        }
    }

    /// Number of times this view has been materialized.
    pub fn materializations(&self) -> usize {
        self.inner.materializations.load(Ordering::SeqCst)
    }

    /// Nodes produced by the last render pass.
    pub fn nodes(&self) -> Vec<RenderedNode> {
        self.inner.nodes.read().clone()
    }

    /// First rendered node.
    pub fn first_node(&self) -> Option<RenderedNode> {
        self.inner.nodes.read().first().cloned()
    }

    /// Last rendered node.
    pub fn last_node(&self) -> Option<RenderedNode> {
        self.inner.nodes.read().last().cloned()
    }

    /// Text rendered by this view and its descendants, in order.
    pub fn text(&self) -> String {
        let children: IndexMap<ViewId, View> = self
            .children()
            .into_iter()
            .map(|child| (child.id(), child))
            .collect();
        self.nodes()
            .into_iter()
            .map(|node| match node {
                RenderedNode::Text(text) => text,
                RenderedNode::View(id) => children.get(&id).map(View::text).unwrap_or_default(),
            })
            .collect()
    }

    pub(crate) fn add_event_map(&self, map: CompiledEventMap) {
        self.inner.event_maps.write().push(map);
    }

    pub(crate) fn event_maps(&self) -> Vec<CompiledEventMap> {
        self.inner.event_maps.read().clone()
    }

    /// Number of event maps attached to this view.
    pub fn event_map_count(&self) -> usize {
        self.inner.event_maps.read().len()
    }

    /// Error recorded by the last failed render pass.
    pub fn last_error(&self) -> Option<ComponentError> {
        self.inner.last_error.lock().clone()
    }

    pub(crate) fn record_error(&self, error: Option<ComponentError>) {
        *self.inner.last_error.lock() = error;
    }

    /// Check if the renderer has started this view.
    pub fn is_created(&self) -> bool {
        self.inner.created.load(Ordering::SeqCst)
    }

    /// Check if the first render pass has completed.
    pub fn is_rendered(&self) -> bool {
        self.inner.rendered.load(Ordering::SeqCst)
    }

    /// Check if the view has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_created(&self) {
        self.inner.created.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_rendered(&self) {
        self.inner.rendered.store(true, Ordering::SeqCst);
    }

    /// Returns `false` if the view was already destroyed.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.inner.destroyed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn render_fn(&self) -> Option<Arc<RenderFn>> {
        self.inner.render.clone()
    }

    pub(crate) fn data_source(&self) -> Option<Arc<DataFn>> {
        self.inner.data_source.clone()
    }

    pub(crate) fn add_computation(&self, computation: Computation) {
        self.inner.computations.lock().push(computation);
    }

    pub(crate) fn stop_computations(&self) {
        let computations = std::mem::take(&mut *self.inner.computations.lock());
        for computation in computations {
            computation.stop();
        }
    }

    pub(crate) fn replace_rendered(&self, nodes: Vec<RenderedNode>, children: Vec<Child>) {
        *self.inner.nodes.write() = nodes;
        *self.inner.children.lock() = children;
    }

    pub(crate) fn take_children(&self) -> Vec<Child> {
        std::mem::take(&mut *self.inner.children.lock())
    }

    pub(crate) fn mount(&self) -> Option<MountPoint> {
        self.inner.mount.lock().clone()
    }

    pub(crate) fn set_mount(&self, mount: Option<MountPoint>) -> Option<MountPoint> {
        std::mem::replace(&mut *self.inner.mount.lock(), mount)
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakView {
        WeakView(Arc::downgrade(&self.inner))
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl fmt::Debug for TemplateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSlot::Component(component) => f
                .debug_tuple("Component")
                .field(&component.upgrade().map(|c| c.kind().to_string()))
                .finish(),
            TemplateSlot::Template(template) => {
                f.debug_tuple("Template").field(&template.name()).finish()
            }
        }
    }
}

/// Iterator from a view up to the root.
pub struct Ancestors {
    next: Option<View>,
}

impl Iterator for Ancestors {
    type Item = View;

    fn next(&mut self) -> Option<View> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

impl Child {
    pub(crate) fn view(view: View) -> Self {
        Self { view, owner: None }
    }

    pub(crate) fn owned(view: View, owner: Component) -> Self {
        Self {
            view,
            owner: Some(owner),
        }
    }
}
