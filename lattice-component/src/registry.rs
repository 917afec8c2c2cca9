//! Registry
//!
//! The namespace templates and helpers are registered in. There is no
//! global registry: an application constructs one, hands it to its
//! components, and tears it down when it is done.
//!
//! # What Registration Does
//!
//! - `register_component(name, class)` registers a template under `name`
//!   that builds a fresh instance of `class` from the inclusion arguments
//!   and block content of the site it is rendered at.
//! - `register_component_method(method, class)` registers a helper named
//!   `"<kind>_<method>"` that calls `method` on the nearest instance of
//!   `class` above the calling view.
//! - `getState`, `hasState` and `stateEquals` are always registered; they
//!   query the state store of the nearest component.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::capability::{Invocation, Receiver, Resolved};
use crate::component::{Component, ComponentClass, ComponentClassBuilder, ComponentOptions};
use crate::config::Config;
use crate::error::{ComponentError, Result};
use crate::lookup;
use crate::reactive::Tracker;
use crate::template::Template;
use crate::view::{Content, View};

/// A globally registered helper.
pub type Helper = Arc<dyn Fn(&HelperContext, Vec<Value>) -> Result<Value> + Send + Sync>;

/// Where a helper was called from.
#[derive(Clone, Debug)]
pub struct HelperContext {
    view: View,
    tracker: Tracker,
    registry: Registry,
}

impl HelperContext {
    pub fn new(view: &View, tracker: &Tracker, registry: &Registry) -> Self {
        Self {
            view: view.clone(),
            tracker: tracker.clone(),
            registry: registry.clone(),
        }
    }

    /// The calling view.
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Templates, helpers and component classes by name.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: Config,
    templates: DashMap<String, Template>,
    helpers: DashMap<String, Helper>,
    components: DashMap<String, ComponentClass>,
}

/// Non-owning registry handle, held by registered templates.
#[derive(Clone)]
struct WeakRegistry(Weak<RegistryInner>);

impl WeakRegistry {
    fn upgrade(&self) -> Option<Registry> {
        self.0.upgrade().map(|inner| Registry { inner })
    }
}

impl Registry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a registry with the built-in state helpers installed.
    pub fn with_config(config: Config) -> Self {
        let registry = Self {
            inner: Arc::new(RegistryInner {
                config,
                templates: DashMap::new(),
                helpers: DashMap::new(),
                components: DashMap::new(),
            }),
        };
        registry.install_state_helpers();
        registry
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Register a template, replacing any template of the same name.
    pub fn register_template(&self, name: impl Into<String>, template: Template) {
        let name = name.into();
        if self.inner.templates.insert(name.clone(), template).is_some() {
            warn!(template = %name, "replaced registered template");
        } else {
            debug!(template = %name, "registered template");
        }
    }

    pub fn template(&self, name: &str) -> Option<Template> {
        self.inner
            .templates
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Register a helper, replacing any helper of the same name.
    pub fn register_helper<F>(&self, name: impl Into<String>, helper: F)
    where
        F: Fn(&HelperContext, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .inner
            .helpers
            .insert(name.clone(), Arc::new(helper))
            .is_some()
        {
            warn!(helper = %name, "replaced registered helper");
        } else {
            debug!(helper = %name, "registered helper");
        }
    }

    pub fn helper(&self, name: &str) -> Option<Helper> {
        self.inner
            .helpers
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// The class registered under `name`.
    pub fn component(&self, name: &str) -> Option<ComponentClass> {
        self.inner
            .components
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Make `name` renderable as an instance of `class`.
    ///
    /// Registering the same class twice is fine. Fails if `name` is empty
    /// or already taken by a different class.
    pub fn register_component(&self, name: &str, class: &ComponentClass) -> Result<()> {
        if name.is_empty() {
            return Err(ComponentError::precondition("component name must not be empty"));
        }

        match self.inner.components.entry(name.to_string()) {
            Entry::Occupied(existing) if existing.get().ptr_eq(class) => return Ok(()),
            Entry::Occupied(_) => {
                return Err(ComponentError::RegistrationConflict {
                    name: name.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(class.clone());
            }
        }

        let registry = WeakRegistry(Arc::downgrade(&self.inner));
        let component_class = class.clone();
        let template = Template::new(name, move |view, tracker| {
            let Some(registry) = registry.upgrade() else {
                return Ok(Content::Empty);
            };
            let args = lookup::get_inclusion_arguments(view, tracker);
            let mut options = ComponentOptions::from_inclusion_args(args);
            options.content = view.content_block();
            options.else_content = view.else_block();
            Ok(Content::Component(Component::new(
                &registry,
                &component_class,
                options,
            )))
        });
        self.register_template(name, template);

        debug!(component = name, class = class.name(), "registered component");
        Ok(())
    }

    /// Expose `method` of `class` as the helper `"<kind>_<method>"`.
    ///
    /// A trailing object argument is passed as options, apart from the
    /// positional arguments; its `hash` field is used when present.
    pub fn register_component_method(&self, method: &str, class: &ComponentClass) -> Result<()> {
        if method.is_empty() {
            return Err(ComponentError::precondition("method name must not be empty"));
        }

        let kind = class.name().to_string();
        let helper_name = format!("{kind}_{method}");
        let class = class.clone();
        let method = method.to_string();

        self.register_helper(helper_name, move |cx, args| {
            let component = lookup::find_first_component_of_class(&class, cx.view())
                .ok_or_else(|| {
                    ComponentError::lookup(format!(
                        "component not found: no {kind:?} component in the view tree"
                    ))
                })?;
            let callable = component.class().method(&method).ok_or_else(|| {
                ComponentError::lookup(format!(
                    "method not found: the {kind:?} component has no method {method:?}"
                ))
            })?;

            let (args, options) = split_options(args);
            let invocation = Invocation::new(Receiver::Component(component), args)
                .with_options(options)
                .with_view(Some(cx.view().clone()))
                .with_tracker(cx.tracker().clone());
            callable(&invocation)
        });
        Ok(())
    }

    /// Build a class, register it under its name and expose its methods.
    pub fn define(&self, builder: ComponentClassBuilder) -> Result<ComponentClass> {
        let class = builder.build()?;
        self.register_component(class.name(), &class)?;
        let methods: Vec<String> = class
            .capabilities()
            .method_names()
            .map(str::to_string)
            .collect();
        for method in methods {
            self.register_component_method(&method, &class)?;
        }
        Ok(class)
    }

    /// Call `name` as a template helper from `view`.
    ///
    /// The lookup walk answers first; registered helpers are the fallback.
    pub fn call_helper(
        &self,
        view: &View,
        name: &str,
        args: Vec<Value>,
        tracker: &Tracker,
    ) -> Result<Value> {
        match lookup::lookup(view, name) {
            Some(Resolved::Function(function)) => {
                let invocation = Invocation::new(function.receiver().clone(), args)
                    .with_view(Some(view.clone()))
                    .with_tracker(tracker.clone());
                return function.invoke(&invocation);
            }
            Some(Resolved::Value(value)) => return Ok(value),
            None => {}
        }

        let helper = self
            .helper(name)
            .ok_or_else(|| ComponentError::lookup(format!("no helper named {name:?}")))?;
        helper(&HelperContext::new(view, tracker, self), args)
    }

    /// Remove every registration, built-in helpers included.
    pub fn teardown(&self) {
        self.inner.templates.clear();
        self.inner.helpers.clear();
        self.inner.components.clear();
        debug!("registry torn down");
    }

    fn install_state_helpers(&self) {
        self.register_helper("getState", |cx, args| {
            let (component, key, _) = state_query(cx, args, "getState", 1)?;
            Ok(component
                .state()
                .get(&key, cx.tracker())
                .unwrap_or(Value::Null))
        });
        self.register_helper("hasState", |cx, args| {
            let (component, key, _) = state_query(cx, args, "hasState", 1)?;
            Ok(Value::Bool(component.state().has(&key, cx.tracker())))
        });
        self.register_helper("stateEquals", |cx, args| {
            let (component, key, value) = state_query(cx, args, "stateEquals", 2)?;
            Ok(Value::Bool(
                component.state().equals(&key, &value, cx.tracker()),
            ))
        });
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("templates", &self.inner.templates.len())
            .field("helpers", &self.inner.helpers.len())
            .field("components", &self.inner.components.len())
            .finish()
    }
}

/// Split a trailing object argument off as options.
fn split_options(mut args: Vec<Value>) -> (Vec<Value>, Option<Value>) {
    match args.last() {
        Some(Value::Object(_)) => {
            let options = args.pop().map(|last| match last {
                Value::Object(mut map) => map.remove("hash").unwrap_or(Value::Object(map)),
                other => other,
            });
            (args, options)
        }
        _ => (args, None),
    }
}

/// Resolve the nearest component and the `(key, value)` arguments of a
/// state helper taking `arity` positional arguments.
///
/// A trailing object is only dropped as options when it comes after all
/// `arity` arguments, so an object value is compared as a value.
fn state_query(
    cx: &HelperContext,
    args: Vec<Value>,
    helper: &str,
    arity: usize,
) -> Result<(Component, String, Value)> {
    let component = lookup::find_first_component(cx.view()).ok_or_else(|| {
        ComponentError::lookup(format!("component not found: {helper} needs a component"))
    })?;

    let mut args = if args.len() > arity {
        split_options(args).0
    } else {
        args
    };
    if args.is_empty() {
        return Err(ComponentError::precondition(format!(
            "{helper} needs a key"
        )));
    }
    let key = match args.remove(0) {
        Value::String(key) => key,
        other => {
            return Err(ComponentError::precondition(format!(
                "{helper} key must be a string, got {other}"
            )))
        }
    };
    let value = args.into_iter().next().unwrap_or(Value::Null);
    Ok((component, key, value))
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare_view() -> View {
        View::new("v", |_, _| Ok(Content::Empty))
    }

    #[test]
    fn split_options_prefers_hash() {
        let (args, options) = split_options(vec![json!(1), json!({"hash": {"x": 1}})]);
        assert_eq!(args, vec![json!(1)]);
        assert_eq!(options, Some(json!({"x": 1})));

        let (args, options) = split_options(vec![json!({"y": 2})]);
        assert!(args.is_empty());
        assert_eq!(options, Some(json!({"y": 2})));

        let (args, options) = split_options(vec![json!(1), json!("two")]);
        assert_eq!(args.len(), 2);
        assert_eq!(options, None);
    }

    #[test]
    fn registration_conflicts_fail_loudly() {
        let registry = Registry::new();
        let first = ComponentClass::builder("Thing").build().unwrap();
        let second = ComponentClass::builder("Thing").build().unwrap();

        registry.register_component("Thing", &first).unwrap();
        registry.register_component("Thing", &first).unwrap();
        assert_eq!(
            registry.register_component("Thing", &second).unwrap_err(),
            ComponentError::RegistrationConflict {
                name: "Thing".into()
            }
        );
        assert!(matches!(
            registry.register_component("", &first),
            Err(ComponentError::Precondition(_))
        ));
        assert!(registry.template("Thing").is_some());
    }

    #[test]
    fn concurrent_registrations_admit_one_class() {
        let registry = Registry::new();
        let classes: Vec<ComponentClass> = (0..8)
            .map(|_| ComponentClass::builder("Shared").build().unwrap())
            .collect();

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = classes
                .iter()
                .map(|class| {
                    let registry = registry.clone();
                    scope.spawn(move || registry.register_component("Shared", class).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let winner = registry.component("Shared").unwrap();
        let index = outcomes.iter().position(|ok| *ok).unwrap();
        assert!(winner.ptr_eq(&classes[index]));
    }

    #[test]
    fn define_registers_methods() {
        let registry = Registry::new();
        let class = registry
            .define(
                ComponentClass::builder("Form")
                    .method("submit", |_| Ok(Value::Null))
                    .method("reset", |_| Ok(Value::Null)),
            )
            .unwrap();

        assert_eq!(registry.component("Form"), Some(class));
        assert!(registry.helper("Form_submit").is_some());
        assert!(registry.helper("Form_reset").is_some());
    }

    #[test]
    fn state_helpers_need_a_component() {
        let registry = Registry::new();
        let err = registry
            .call_helper(&bare_view(), "getState", vec![json!("open")], &Tracker::untracked())
            .unwrap_err();
        assert!(matches!(err, ComponentError::Lookup(ref m) if m.contains("component not found")));
    }

    #[test]
    fn unknown_helpers_are_lookup_errors() {
        let registry = Registry::new();
        let err = registry
            .call_helper(&bare_view(), "nope", vec![], &Tracker::untracked())
            .unwrap_err();
        assert_eq!(err.code(), "COMPONENT_LOOKUP");
    }

    #[test]
    fn teardown_clears_everything() {
        let registry = Registry::new();
        registry.register_template("t", Template::text("t", "x"));
        assert!(registry.helper("getState").is_some());

        registry.teardown();
        assert!(registry.template("t").is_none());
        assert!(registry.helper("getState").is_none());
    }
}
