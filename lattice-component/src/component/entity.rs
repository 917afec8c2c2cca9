//! Component entities.
//!
//! A [`Component`] is one instance of a [`ComponentClass`]. It owns its
//! options, a reactive data cell, a private state store, lifecycle hooks,
//! and at most one view at a time.
//!
//! # Lifecycle
//!
//! ```text
//! Uncreated --create_view--> Created --destroy--> Destroyed
//!                               ^                      |
//!                               +-----create_view------+
//! ```
//!
//! `create_view` on a created component fails. `destroy` on anything but
//! a created component does nothing. A destroyed component can be created
//! again and gets a brand-new view.
//!
//! # The Component View
//!
//! The view built by `create_view` renders a data scope whose value is the
//! component's own data, or, when that is unset, the data context of the
//! component view's parent. Inside that scope it renders the component.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::capability::{Receiver, Resolved};
use crate::error::{ComponentError, Result};
use crate::events::attach_event_maps;
use crate::lookup;
use crate::reactive::{Signal, StateStore, Tracker};
use crate::registry::Registry;
use crate::template::{normalize_name, Template};
use crate::view::{Content, Hook, Range, Renderer, TemplateSlot, View, ViewKind};

use super::class::{ComponentClass, TemplateSpec};

/// Where a component is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uncreated,
    Created,
    Destroyed,
}

/// Function producing lazily computed data.
pub type LazyData = Arc<dyn Fn(&Tracker) -> Option<Value> + Send + Sync>;

/// A component's data: a value, or a function producing one on each read.
#[derive(Clone)]
pub enum DataSource {
    Value(Value),
    Lazy(LazyData),
}

impl DataSource {
    /// Lazily computed data.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn(&Tracker) -> Option<Value> + Send + Sync + 'static,
    {
        DataSource::Lazy(Arc::new(f))
    }

    fn resolve(&self, tracker: &Tracker) -> Option<Value> {
        match self {
            DataSource::Value(value) => Some(value.clone()),
            DataSource::Lazy(f) => f(tracker),
        }
    }
}

impl PartialEq for DataSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataSource::Value(a), DataSource::Value(b)) => a == b,
            (DataSource::Lazy(a), DataSource::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for DataSource {
    fn from(value: Value) -> Self {
        DataSource::Value(value)
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DataSource::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// Construction options.
#[derive(Clone, Default, Debug)]
pub struct ComponentOptions {
    pub data: Option<DataSource>,
    /// Block content from the inclusion site.
    pub content: Option<Template>,
    pub else_content: Option<Template>,
    /// Overrides the class template.
    pub template: Option<TemplateSpec>,
    /// Everything else.
    pub values: Map<String, Value>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from inclusion arguments.
    ///
    /// In an object, `data` becomes the data and a string `template` the
    /// template name; every other key, these two included, is kept in
    /// `values`. A non-object argument becomes the data.
    pub fn from_inclusion_args(args: Option<Value>) -> Self {
        let mut options = Self::new();
        match args {
            Some(Value::Object(map)) => {
                options.data = map.get("data").cloned().map(DataSource::Value);
                options.template = map
                    .get("template")
                    .and_then(Value::as_str)
                    .map(|name| TemplateSpec::Named(name.to_string()));
                options.values = map;
            }
            Some(Value::Null) | None => {}
            Some(other) => options.data = Some(DataSource::Value(other)),
        }
        options
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(DataSource::Value(data.into()));
        self
    }

    pub fn with_lazy_data<F>(mut self, f: F) -> Self
    where
        F: Fn(&Tracker) -> Option<Value> + Send + Sync + 'static,
    {
        self.data = Some(DataSource::lazy(f));
        self
    }

    pub fn with_content(mut self, content: &Template) -> Self {
        self.content = Some(content.clone());
        self
    }

    pub fn with_else(mut self, else_content: &Template) -> Self {
        self.else_content = Some(else_content.clone());
        self
    }

    pub fn with_template(mut self, template: impl Into<TemplateSpec>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Lifecycle hook callback: the view that fired and the component.
pub type HookFn = Arc<dyn Fn(&View, &Component) + Send + Sync>;

/// Where `insert` attaches the component.
#[derive(Clone, Debug, Default)]
pub struct InsertOptions {
    /// Mount point selector; the configured default when unset.
    pub el: Option<String>,
    /// View to render under.
    pub parent_view: Option<View>,
}

impl InsertOptions {
    pub fn into_el(selector: impl Into<String>) -> Self {
        Self {
            el: Some(selector.into()),
            parent_view: None,
        }
    }

    pub fn with_parent_view(mut self, parent: &View) -> Self {
        self.parent_view = Some(parent.clone());
        self
    }
}

/// A component instance.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

/// Non-owning component handle.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

struct ComponentInner {
    id: u64,
    class: ComponentClass,
    registry: Registry,
    options: RwLock<ComponentOptions>,
    data: Signal<Option<DataSource>>,
    state: StateStore,
    hooks: Mutex<IndexMap<Hook, SmallVec<[HookFn; 2]>>>,
    view: Mutex<Option<View>>,
    range: Mutex<Option<Range>>,
    lifecycle: Mutex<LifecycleState>,
    inserted: AtomicBool,
}

fn next_component_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

impl Component {
    /// Construct an instance and run the class `init`.
    pub fn new(registry: &Registry, class: &ComponentClass, options: ComponentOptions) -> Self {
        let component = Self {
            inner: Arc::new(ComponentInner {
                id: next_component_id(),
                class: class.clone(),
                registry: registry.clone(),
                data: Signal::new(options.data.clone()),
                options: RwLock::new(options),
                state: StateStore::new(),
                hooks: Mutex::new(IndexMap::new()),
                view: Mutex::new(None),
                range: Mutex::new(None),
                lifecycle: Mutex::new(LifecycleState::Uncreated),
                inserted: AtomicBool::new(false),
            }),
        };

        if let Some(init) = class.init_fn() {
            let options = component.options();
            init(&component, &options);
        }
        trace!(component = component.kind(), id = component.id(), "component constructed");
        component
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn class(&self) -> &ComponentClass {
        &self.inner.class
    }

    /// Name of the component class.
    pub fn kind(&self) -> &str {
        self.inner.class.name()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Snapshot of the construction options.
    pub fn options(&self) -> ComponentOptions {
        self.inner.options.read().clone()
    }

    pub fn option(&self, key: &str) -> Option<Value> {
        self.inner.options.read().values.get(key).cloned()
    }

    pub fn set_option(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .options
            .write()
            .values
            .insert(key.into(), value.into());
    }

    /// Read the data, registering a dependency on the data cell.
    ///
    /// Lazy data is computed on every read.
    pub fn data(&self, tracker: &Tracker) -> Option<Value> {
        self.inner
            .data
            .get(tracker)
            .and_then(|source| source.resolve(tracker))
    }

    /// Replace the data. Writing the current value is a no-op that
    /// invalidates nothing; returns whether the data changed.
    pub fn set_data(&self, data: impl Into<DataSource>) -> bool {
        self.inner.data.set(Some(data.into()))
    }

    /// Unset the data, so the view falls back to the enclosing context.
    pub fn clear_data(&self) -> bool {
        self.inner.data.set(None)
    }

    /// Number of times the data actually changed.
    pub fn data_change_count(&self) -> usize {
        self.inner.data.change_count()
    }

    /// This instance's state store.
    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    /// The owned view, if created.
    pub fn view(&self) -> Option<View> {
        self.inner.view.lock().clone()
    }

    /// The rendered range, once inserted.
    pub fn range(&self) -> Option<Range> {
        self.inner.range.lock().clone()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.inner.lifecycle.lock()
    }

    pub fn is_created(&self) -> bool {
        self.lifecycle_state() == LifecycleState::Created
    }

    /// Destroyed and not created again.
    pub fn is_destroyed(&self) -> bool {
        self.lifecycle_state() == LifecycleState::Destroyed
    }

    pub fn is_inserted(&self) -> bool {
        self.inner.inserted.load(Ordering::SeqCst)
    }

    /// Build this component's view.
    pub fn create_view(&self) -> Result<View> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if *lifecycle == LifecycleState::Created {
                return Err(ComponentError::AlreadyCreated {
                    kind: self.kind().to_string(),
                });
            }
            *lifecycle = LifecycleState::Created;
        }

        let weak = self.downgrade();
        let view = View::with_kind(
            ViewKind::Component {
                kind: self.kind().to_string(),
            },
            "Component",
            move |view, _| Ok(Content::View(data_scope(&weak, view))),
        );

        for hook in Hook::ALL {
            let weak = self.downgrade();
            view.on(hook, move |view| {
                if let Some(component) = weak.upgrade() {
                    component.run_hooks(hook, view);
                }
            });
        }

        let weak = self.downgrade();
        view.on(Hook::Materialized, move |view| {
            let Some(component) = weak.upgrade() else {
                return;
            };
            component.inner.inserted.store(true, Ordering::SeqCst);
            if view.materializations() == 1 {
                attach_event_maps(view, &component.class().event_maps());
            }
        });

        let weak = self.downgrade();
        view.on(Hook::Destroyed, move |view| {
            if let Some(component) = weak.upgrade() {
                component.release(view);
            }
        });

        view.set_component(self.downgrade());
        view.set_template(TemplateSlot::Component(self.downgrade()));
        *self.inner.view.lock() = Some(view.clone());

        debug!(component = self.kind(), view = view.id().raw(), "component view created");
        Ok(view)
    }

    /// Render and attach the component. Does nothing if already inserted.
    pub fn insert(&self, renderer: &Renderer, options: InsertOptions) -> Result<()> {
        if self.is_inserted() {
            return Ok(());
        }

        let mount = renderer.mount_point(options.el.as_deref())?;
        let view = match self.view() {
            Some(view) => view,
            None => self.create_view()?,
        };

        let existing = self.inner.range.lock().clone();
        let range = match existing {
            Some(range) => range,
            None => {
                let range = if view.is_created() {
                    Range::new(view.clone())
                } else {
                    renderer.render(&view, options.parent_view.as_ref())?
                };
                *self.inner.range.lock() = Some(range.clone());
                range
            }
        };

        range.attach(&mount)?;
        self.inner.inserted.store(true, Ordering::SeqCst);
        debug!(component = self.kind(), mount = mount.selector(), "component inserted");
        Ok(())
    }

    /// Tear the view down. Does nothing unless created.
    pub fn destroy(&self) {
        let view = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if *lifecycle != LifecycleState::Created {
                return;
            }
            *lifecycle = LifecycleState::Destroyed;
            self.inner.view.lock().take()
        };
        self.inner.inserted.store(false, Ordering::SeqCst);
        self.inner.range.lock().take();

        if let Some(view) = view {
            Renderer::destroy_view(&view);
            view.clear_component();
        }
        debug!(component = self.kind(), id = self.id(), "component destroyed");
    }

    /// The view was torn down by its parent rather than by `destroy`.
    fn release(&self, view: &View) {
        let mut lifecycle = self.inner.lifecycle.lock();
        let mut owned = self.inner.view.lock();
        if owned.as_ref() != Some(view) {
            return;
        }
        owned.take();
        *lifecycle = LifecycleState::Destroyed;
        self.inner.inserted.store(false, Ordering::SeqCst);
        self.inner.range.lock().take();
        trace!(component = self.kind(), "component view released by renderer");
    }

    /// Call a function found by walking up from this component's view.
    ///
    /// The function runs with the current data context as its receiver.
    pub fn apply(&self, name: &str, args: Vec<Value>, tracker: &Tracker) -> Result<Value> {
        if self.is_destroyed() {
            return Err(ComponentError::Destroyed {
                kind: self.kind().to_string(),
            });
        }

        let view = self.view();
        let function = view
            .as_ref()
            .and_then(|view| lookup::lookup(view, name))
            .and_then(|resolved| match resolved {
                Resolved::Function(function) => Some(function),
                Resolved::Value(_) => None,
            })
            .ok_or_else(|| ComponentError::lookup(format!("no function named {name:?}")))?;

        let receiver = view
            .as_ref()
            .and_then(|view| lookup::get_data_context(view, tracker))
            .map(Receiver::Data)
            .unwrap_or_else(Receiver::empty);

        function.call_with(receiver, args, view, tracker)
    }

    /// `apply` without dependency tracking.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.apply(name, args, &Tracker::untracked())
    }

    /// Resolve what to render.
    ///
    /// A template name is looked up in the registry, then retried in
    /// camel case. A template value is used as-is. Without either, block
    /// content is rendered with this component as its lookup target.
    pub fn lookup_template(&self) -> Result<Content> {
        let (spec, content) = {
            let options = self.inner.options.read();
            (options.template.clone(), options.content.clone())
        };

        match spec.or_else(|| self.class().template().cloned()) {
            Some(TemplateSpec::Named(name)) => {
                let registry = &self.inner.registry;
                if let Some(template) = registry.template(&name) {
                    return Ok(Content::Template(template));
                }
                let normalized = normalize_name(&name);
                if registry.config().normalize_template_names {
                    if let Some(template) = registry.template(&normalized) {
                        return Ok(Content::Template(template));
                    }
                }
                Err(ComponentError::TemplateNotFound { name, normalized })
            }
            Some(TemplateSpec::Template(template)) => Ok(Content::Template(template)),
            None => match content {
                Some(content) => {
                    let view = View::for_template(&content);
                    view.set_template(TemplateSlot::Component(self.downgrade()));
                    Ok(Content::View(view))
                }
                None => Ok(Content::Empty),
            },
        }
    }

    /// Render output: the class override if any, else the looked-up template.
    pub fn render(&self, tracker: &Tracker) -> Result<Content> {
        match self.class().render_fn() {
            Some(render) => render(self, tracker),
            None => self.lookup_template(),
        }
    }

    /// Register a lifecycle hook.
    ///
    /// A hook added after its notification fired runs from the next one on.
    pub fn on<F>(&self, hook: Hook, callback: F) -> &Self
    where
        F: Fn(&View, &Component) + Send + Sync + 'static,
    {
        self.inner
            .hooks
            .lock()
            .entry(hook)
            .or_default()
            .push(Arc::new(callback));
        self
    }

    pub fn on_created<F>(&self, callback: F) -> &Self
    where
        F: Fn(&View, &Component) + Send + Sync + 'static,
    {
        self.on(Hook::Created, callback)
    }

    pub fn on_materialized<F>(&self, callback: F) -> &Self
    where
        F: Fn(&View, &Component) + Send + Sync + 'static,
    {
        self.on(Hook::Materialized, callback)
    }

    pub fn on_rendered<F>(&self, callback: F) -> &Self
    where
        F: Fn(&View, &Component) + Send + Sync + 'static,
    {
        self.on(Hook::Rendered, callback)
    }

    pub fn on_destroyed<F>(&self, callback: F) -> &Self
    where
        F: Fn(&View, &Component) + Send + Sync + 'static,
    {
        self.on(Hook::Destroyed, callback)
    }

    fn run_hooks(&self, hook: Hook, view: &View) {
        let hooks: SmallVec<[HookFn; 2]> = self
            .inner
            .hooks
            .lock()
            .get(&hook)
            .cloned()
            .unwrap_or_default();
        for callback in hooks {
            callback(view, self);
        }
    }

    /// Accessor for the inclusion arguments of `view`.
    ///
    /// Nothing is read until the accessor is called; with a key it returns
    /// that argument, without one the whole argument value.
    pub fn args(view: &View) -> impl Fn(Option<&str>, &Tracker) -> Option<Value> + Send + Sync {
        let view = view.downgrade();
        move |key: Option<&str>, tracker: &Tracker| {
            let view = view.upgrade()?;
            let args = lookup::get_inclusion_arguments(&view, tracker)?;
            match key {
                Some(key) => args.get(key).cloned(),
                None => Some(args),
            }
        }
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Arc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// The data scope a component view renders: own data first, then the
/// parent data context.
fn data_scope(component: &WeakComponent, view: &View) -> View {
    let data_component = component.clone();
    let component_view = view.downgrade();
    let content_component = component.clone();

    View::with_data(
        move |tracker| {
            let Some(component) = data_component.upgrade() else {
                return Ok(None);
            };
            match component.data(tracker) {
                Some(data) => Ok(Some(data)),
                None => Ok(component_view
                    .upgrade()
                    .and_then(|view| lookup::get_parent_data_context(&view, tracker))),
            }
        },
        move |_, tracker| match content_component.upgrade() {
            Some(component) => component.render(tracker),
            None => Ok(Content::Empty),
        },
    )
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("kind", &self.kind())
            .field("lifecycle", &self.lifecycle_state())
            .finish()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Document;
    use serde_json::json;
    use std::sync::atomic::AtomicI32;

    fn setup() -> (Registry, Renderer) {
        let registry = Registry::new();
        let renderer = Renderer::new(
            crate::reactive::Runtime::new(),
            Document::with_mount_points(["body"]),
        );
        (registry, renderer)
    }

    fn class(name: &str) -> ComponentClass {
        ComponentClass::builder(name).build().unwrap()
    }

    #[test]
    fn missing_options_are_fine() {
        let (registry, _) = setup();
        let component = Component::new(&registry, &class("Plain"), ComponentOptions::default());
        assert_eq!(component.data(&Tracker::untracked()), None);
        assert_eq!(component.lifecycle_state(), LifecycleState::Uncreated);
        assert!(component.view().is_none());
    }

    #[test]
    fn init_runs_with_options() {
        let (registry, _) = setup();
        let class = ComponentClass::builder("Init")
            .init(|component, options| {
                let start = options.get("start").cloned().unwrap_or(json!(0));
                component.state().set("count", start);
            })
            .build()
            .unwrap();
        let component = Component::new(
            &registry,
            &class,
            ComponentOptions::new().with_value("start", 5),
        );
        assert_eq!(
            component.state().get("count", &Tracker::untracked()),
            Some(json!(5))
        );
    }

    #[test]
    fn lazy_data_is_computed_on_read() {
        let (registry, _) = setup();
        let calls = Arc::new(AtomicI32::new(0));
        let counter = calls.clone();
        let component = Component::new(
            &registry,
            &class("Lazy"),
            ComponentOptions::new().with_lazy_data(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(json!("computed"))
            }),
        );

        assert_eq!(component.data(&Tracker::untracked()), Some(json!("computed")));
        assert_eq!(component.data(&Tracker::untracked()), Some(json!("computed")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn same_data_write_is_suppressed() {
        let (registry, _) = setup();
        let component = Component::new(&registry, &class("Data"), ComponentOptions::new());
        assert!(component.set_data(json!({"a": 1})));
        assert!(!component.set_data(json!({"a": 1})));
        assert_eq!(component.data_change_count(), 1);
    }

    #[test]
    fn create_destroy_create() {
        let (registry, _) = setup();
        let component = Component::new(&registry, &class("Cycle"), ComponentOptions::new());

        component.destroy();
        assert_eq!(component.lifecycle_state(), LifecycleState::Uncreated);

        let first = component.create_view().unwrap();
        assert!(matches!(
            component.create_view(),
            Err(ComponentError::AlreadyCreated { .. })
        ));
        assert_eq!(first.kind_tag(), Some("Cycle"));
        assert_eq!(first.component(), Some(component.clone()));

        component.destroy();
        assert!(component.is_destroyed());
        assert!(first.is_destroyed());
        assert!(first.component().is_none());
        component.destroy();
        assert!(component.is_destroyed());

        let second = component.create_view().unwrap();
        assert_ne!(first, second);
        assert!(component.is_created());
    }

    #[test]
    fn insert_is_idempotent_and_checks_the_mount_point() {
        let (registry, renderer) = setup();
        let component = Component::new(&registry, &class("Ins"), ComponentOptions::new());

        let err = component
            .insert(&renderer, InsertOptions::into_el("#missing"))
            .unwrap_err();
        assert!(matches!(err, ComponentError::MissingMountPoint { .. }));
        assert!(!component.is_inserted());

        let rendered = Arc::new(AtomicI32::new(0));
        let counter = rendered.clone();
        component.on_rendered(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        component.insert(&renderer, InsertOptions::default()).unwrap();
        component.insert(&renderer, InsertOptions::default()).unwrap();
        assert!(component.is_inserted());
        assert_eq!(rendered.load(Ordering::SeqCst), 1);

        let body = renderer.mount_point(None).unwrap();
        assert!(body.contains(&component.view().unwrap()));

        component.destroy();
        assert!(!component.is_inserted());
        assert!(body.views().is_empty());
    }

    #[test]
    fn hooks_receive_view_and_component() {
        let (registry, renderer) = setup();
        let component = Component::new(&registry, &class("Hooks"), ComponentOptions::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        for hook in Hook::ALL {
            let log = log.clone();
            component.on(hook, move |view, component| {
                assert_eq!(view.component().as_ref().map(Component::kind), Some("Hooks"));
                log.lock().push((hook.name(), component.kind().to_string()));
            });
        }

        component.insert(&renderer, InsertOptions::default()).unwrap();
        component.destroy();

        let names: Vec<&str> = log.lock().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["onCreated", "onMaterialized", "onRendered", "onDestroyed"]
        );
    }

    #[test]
    fn template_lookup_falls_back_to_camel_case() {
        let (registry, _) = setup();
        registry.register_template("userCard", Template::text("userCard", "card"));

        let class = ComponentClass::builder("Card")
            .template_name("user-card")
            .build()
            .unwrap();
        let component = Component::new(&registry, &class, ComponentOptions::new());
        assert!(matches!(
            component.lookup_template(),
            Ok(Content::Template(t)) if t.name() == "userCard"
        ));

        let missing = Component::new(
            &registry,
            &class,
            ComponentOptions::new().with_template("no-such"),
        );
        assert_eq!(
            missing.lookup_template().unwrap_err(),
            ComponentError::TemplateNotFound {
                name: "no-such".into(),
                normalized: "noSuch".into(),
            }
        );
    }

    #[test]
    fn block_content_renders_when_no_template() {
        let (registry, renderer) = setup();
        let content = Template::text("block", "inside");
        let component = Component::new(
            &registry,
            &class("Wrapper"),
            ComponentOptions::new().with_content(&content),
        );
        component.insert(&renderer, InsertOptions::default()).unwrap();
        assert_eq!(component.view().unwrap().text(), "inside");

        let empty = Component::new(&registry, &class("Empty"), ComponentOptions::new());
        assert!(matches!(empty.lookup_template(), Ok(Content::Empty)));
    }

    #[test]
    fn apply_after_destroy_fails() {
        let (registry, _) = setup();
        let component = Component::new(&registry, &class("Gone"), ComponentOptions::new());
        component.create_view().unwrap();
        component.destroy();
        assert!(matches!(
            component.call("anything", vec![]),
            Err(ComponentError::Destroyed { .. })
        ));
    }

    #[test]
    fn options_from_inclusion_args() {
        let options = ComponentOptions::from_inclusion_args(Some(json!({
            "data": {"id": 7},
            "template": "detail",
            "size": "large",
        })));
        assert_eq!(options.data, Some(DataSource::Value(json!({"id": 7}))));
        assert!(matches!(options.template, Some(TemplateSpec::Named(ref n)) if n == "detail"));
        assert_eq!(options.get("size"), Some(&json!("large")));

        let scalar = ComponentOptions::from_inclusion_args(Some(json!("x")));
        assert_eq!(scalar.data, Some(DataSource::Value(json!("x"))));
        assert!(ComponentOptions::from_inclusion_args(None).data.is_none());
    }
}
