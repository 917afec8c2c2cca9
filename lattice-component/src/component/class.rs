//! Component class descriptors.
//!
//! A [`ComponentClass`] is what a component is an instance of: its name,
//! template, init and render overrides, capability table and event maps.
//! Subclasses are built with [`ComponentClass::extend`] and keep a link to
//! their superclass.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::capability::{Callable, CapabilityTable, Invocation};
use crate::error::{ComponentError, Result};
use crate::events::{bind_event_map, BoundEventMap, EventMap};
use crate::reactive::Tracker;
use crate::template::Template;
use crate::view::Content;

use super::entity::{Component, ComponentOptions};

/// Runs once per instance, after construction.
pub type InitFn = Arc<dyn Fn(&Component, &ComponentOptions) + Send + Sync>;

/// Replaces the default render, which renders the looked-up template.
pub type ComponentRenderFn = Arc<dyn Fn(&Component, &Tracker) -> Result<Content> + Send + Sync>;

/// What a component renders.
#[derive(Clone, Debug)]
pub enum TemplateSpec {
    /// A registered template name.
    Named(String),
    /// A template value, used as-is.
    Template(Template),
}

impl From<&str> for TemplateSpec {
    fn from(name: &str) -> Self {
        TemplateSpec::Named(name.to_string())
    }
}

impl From<Template> for TemplateSpec {
    fn from(template: Template) -> Self {
        TemplateSpec::Template(template)
    }
}

/// A component class.
#[derive(Clone)]
pub struct ComponentClass {
    inner: Arc<ClassInner>,
}

struct ClassInner {
    id: u64,
    name: String,
    superclass: Option<ComponentClass>,
    template: Option<TemplateSpec>,
    init: Option<InitFn>,
    render: Option<ComponentRenderFn>,
    capabilities: CapabilityTable,
    /// Maps declared on this class only; inherited maps stay on the superclass.
    event_maps: RwLock<Vec<BoundEventMap>>,
}

fn next_class_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

impl ComponentClass {
    /// Start a root class.
    pub fn builder(name: impl Into<String>) -> ComponentClassBuilder {
        ComponentClassBuilder::new(name.into(), None)
    }

    /// Start a subclass of this class.
    pub fn extend(&self, name: impl Into<String>) -> ComponentClassBuilder {
        ComponentClassBuilder::new(name.into(), Some(self.clone()))
    }

    /// Class name. This is also the kind tag of its views.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn superclass(&self) -> Option<&ComponentClass> {
        self.inner.superclass.as_ref()
    }

    /// This class followed by its superclasses.
    pub fn lineage(&self) -> impl Iterator<Item = &ComponentClass> {
        std::iter::successors(Some(self), |class| class.superclass())
    }

    /// Check if this class is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &ComponentClass) -> bool {
        self.lineage().any(|class| class.ptr_eq(other))
    }

    /// Template, inherited if this class declares none.
    pub fn template(&self) -> Option<&TemplateSpec> {
        self.lineage().find_map(|class| class.inner.template.as_ref())
    }

    pub(crate) fn init_fn(&self) -> Option<&InitFn> {
        self.lineage().find_map(|class| class.inner.init.as_ref())
    }

    pub(crate) fn render_fn(&self) -> Option<&ComponentRenderFn> {
        self.lineage().find_map(|class| class.inner.render.as_ref())
    }

    /// Inherited and own capabilities.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.inner.capabilities
    }

    /// A declared or inherited method.
    pub fn method(&self, name: &str) -> Option<Callable> {
        self.inner.capabilities.method(name)
    }

    /// Declare another event map on this class.
    ///
    /// Maps accumulate; a later map never replaces an earlier one.
    pub fn events(&self, map: EventMap) -> Result<()> {
        let bound = bind_event_map(&map)?;
        debug!(class = self.name(), handlers = bound.len(), "declared event map");
        self.inner.event_maps.write().push(bound);
        Ok(())
    }

    /// Every event map in dispatch order: superclass maps first.
    pub fn event_maps(&self) -> Vec<BoundEventMap> {
        let mut lineage: Vec<&ComponentClass> = self.lineage().collect();
        lineage.reverse();
        lineage
            .into_iter()
            .flat_map(|class| class.inner.event_maps.read().clone())
            .collect()
    }

    /// Check if two handles refer to the same class.
    pub fn ptr_eq(&self, other: &ComponentClass) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ComponentClass {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("superclass", &self.superclass().map(ComponentClass::name))
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

/// Builder for [`ComponentClass`].
pub struct ComponentClassBuilder {
    name: String,
    superclass: Option<ComponentClass>,
    template: Option<TemplateSpec>,
    init: Option<InitFn>,
    render: Option<ComponentRenderFn>,
    capabilities: CapabilityTable,
    events: Vec<EventMap>,
}

impl ComponentClassBuilder {
    fn new(name: String, superclass: Option<ComponentClass>) -> Self {
        Self {
            name,
            superclass,
            template: None,
            init: None,
            render: None,
            capabilities: CapabilityTable::new(),
            events: Vec::new(),
        }
    }

    /// Name of the class being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render a registered template by name.
    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.template = Some(TemplateSpec::Named(name.into()));
        self
    }

    /// Render a template value.
    pub fn template(mut self, template: &Template) -> Self {
        self.template = Some(TemplateSpec::Template(template.clone()));
        self
    }

    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Component, &ComponentOptions) + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// Replace the default render.
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Component, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Invocation) -> Result<Value> + Send + Sync + 'static,
    {
        self.capabilities.define_method(name, method);
        self
    }

    pub fn helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&Invocation) -> Result<Value> + Send + Sync + 'static,
    {
        self.capabilities.define_helper(name, helper);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.capabilities.define_property(name, value);
        self
    }

    pub fn events(mut self, map: EventMap) -> Self {
        self.events.push(map);
        self
    }

    /// Finish the class. Fails if the name is empty or an event key is invalid.
    pub fn build(self) -> Result<ComponentClass> {
        if self.name.is_empty() {
            return Err(ComponentError::precondition("component class name must not be empty"));
        }

        let capabilities = match &self.superclass {
            Some(superclass) => superclass.capabilities().extended(&self.capabilities),
            None => self.capabilities,
        };
        let event_maps = self
            .events
            .iter()
            .map(bind_event_map)
            .collect::<Result<Vec<_>>>()?;

        let class = ComponentClass {
            inner: Arc::new(ClassInner {
                id: next_class_id(),
                name: self.name,
                superclass: self.superclass,
                template: self.template,
                init: self.init,
                render: self.render,
                capabilities,
                event_maps: RwLock::new(event_maps),
            }),
        };
        debug!(class = class.name(), superclass = ?class.superclass().map(ComponentClass::name), "built component class");
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> impl Fn(&Invocation) -> Result<Value> + Send + Sync + 'static {
        move |_| Ok(value.clone())
    }

    #[test]
    fn subclass_inherits_and_overrides() {
        let base = ComponentClass::builder("Base")
            .template_name("baseTemplate")
            .method("greet", constant(json!("base")))
            .method("leave", constant(json!("bye")))
            .build()
            .unwrap();
        let sub = base
            .extend("Sub")
            .method("greet", constant(json!("sub")))
            .build()
            .unwrap();

        let invocation = Invocation::new(crate::capability::Receiver::empty(), vec![]);
        assert_eq!(sub.method("greet").unwrap()(&invocation).unwrap(), json!("sub"));
        assert!(sub.method("leave").is_some());
        assert!(matches!(sub.template(), Some(TemplateSpec::Named(n)) if n == "baseTemplate"));
        assert!(sub.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&sub));
    }

    #[test]
    fn event_maps_accumulate_superclass_first() {
        let base = ComponentClass::builder("Base")
            .events(EventMap::new().on("click", |_, _, _| Ok(())))
            .build()
            .unwrap();
        let sub = base
            .extend("Sub")
            .events(EventMap::new().on("keyup", |_, _, _| Ok(())))
            .build()
            .unwrap();
        sub.events(EventMap::new().on("submit form", |_, _, _| Ok(())))
            .unwrap();

        assert_eq!(base.event_maps().len(), 1);
        assert_eq!(sub.event_maps().len(), 3);

        base.events(EventMap::new().on("focus", |_, _, _| Ok(())))
            .unwrap();
        assert_eq!(sub.event_maps().len(), 4);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            ComponentClass::builder("").build(),
            Err(ComponentError::Precondition(_))
        ));
    }
}
