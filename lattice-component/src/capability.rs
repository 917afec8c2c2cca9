//! Capability Tables
//!
//! Components and templates expose what they can do through an explicit
//! table built when they are declared, instead of by probing arbitrary
//! fields at lookup time.
//!
//! # Precedence
//!
//! A table holds three kinds of entries. When one name appears in more than
//! one of them, methods win over helpers and helpers win over static
//! properties:
//!
//! ```text
//! methods  >  helpers  >  properties
//! ```
//!
//! A subclass table is its superclass table with the subclass's own entries
//! laid over it, so a subclass entry replaces the inherited one of the same
//! name.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::component::Component;
use crate::error::Result;
use crate::reactive::Tracker;
use crate::template::Template;
use crate::view::View;

/// A declared method or helper.
pub type Callable = Arc<dyn Fn(&Invocation) -> Result<Value> + Send + Sync>;

/// What a callable is invoked on.
#[derive(Clone, Debug)]
pub enum Receiver {
    Component(Component),
    Template(Template),
    /// A data context, or an empty object when there is none.
    Data(Value),
}

impl Receiver {
    /// An empty data receiver.
    pub fn empty() -> Self {
        Receiver::Data(Value::Object(Map::new()))
    }

    /// The component, if the receiver is one.
    pub fn component(&self) -> Option<&Component> {
        match self {
            Receiver::Component(component) => Some(component),
            _ => None,
        }
    }

    /// The data value, if the receiver is one.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Receiver::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// One call of a callable.
#[derive(Clone, Debug)]
pub struct Invocation {
    receiver: Receiver,
    args: Vec<Value>,
    options: Option<Value>,
    view: Option<View>,
    tracker: Tracker,
}

impl Invocation {
    /// A call on `receiver` with positional `args`.
    pub fn new(receiver: Receiver, args: Vec<Value>) -> Self {
        Self {
            receiver,
            args,
            options: None,
            view: None,
            tracker: Tracker::untracked(),
        }
    }

    /// Attach trailing options, kept apart from the positional arguments.
    pub fn with_options(mut self, options: Option<Value>) -> Self {
        self.options = options;
        self
    }

    /// The view the call was made from.
    pub fn with_view(mut self, view: Option<View>) -> Self {
        self.view = view;
        self
    }

    /// Track reads made by the callable.
    pub fn with_tracker(mut self, tracker: Tracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Positional argument `index`, or `Null`.
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }

    /// Trailing options.
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Positional arguments followed by the options, if any.
    pub fn all_args(&self) -> Vec<Value> {
        let mut all = self.args.clone();
        all.extend(self.options.iter().cloned());
        all
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Shorthand for `receiver().component()`.
    pub fn component(&self) -> Option<&Component> {
        self.receiver.component()
    }
}

/// A single table entry.
#[derive(Clone)]
pub enum Capability {
    Method(Callable),
    Helper(Callable),
    Property(Value),
}

impl Capability {
    /// The callable of a method or helper.
    pub fn callable(&self) -> Option<&Callable> {
        match self {
            Capability::Method(callable) | Capability::Helper(callable) => Some(callable),
            Capability::Property(_) => None,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Method(_) => f.write_str("Method"),
            Capability::Helper(_) => f.write_str("Helper"),
            Capability::Property(value) => f.debug_tuple("Property").field(value).finish(),
        }
    }
}

/// Methods, helpers and static properties by name.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    methods: IndexMap<String, Callable>,
    helpers: IndexMap<String, Callable>,
    properties: IndexMap<String, Value>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_method<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&Invocation) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
    }

    pub fn define_helper<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&Invocation) -> Result<Value> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn define_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// A declared method.
    pub fn method(&self, name: &str) -> Option<Callable> {
        self.methods.get(name).cloned()
    }

    /// Declared method names, in declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Resolve `name`, methods first, then helpers, then properties.
    pub fn resolve(&self, name: &str) -> Option<Capability> {
        if let Some(method) = self.methods.get(name) {
            return Some(Capability::Method(method.clone()));
        }
        if let Some(helper) = self.helpers.get(name) {
            return Some(Capability::Helper(helper.clone()));
        }
        self.properties
            .get(name)
            .map(|value| Capability::Property(value.clone()))
    }

    /// Check if anything is declared under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
            || self.helpers.contains_key(name)
            || self.properties.contains_key(name)
    }

    /// This table with `own` laid over it.
    pub fn extended(&self, own: &CapabilityTable) -> CapabilityTable {
        let mut table = self.clone();
        table
            .methods
            .extend(own.methods.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
            .helpers
            .extend(own.helpers.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
            .properties
            .extend(own.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.helpers.is_empty() && self.properties.is_empty()
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A callable bound to the receiver that declared it.
#[derive(Clone)]
pub struct BoundFunction {
    callable: Callable,
    receiver: Receiver,
}

impl BoundFunction {
    pub fn new(callable: Callable, receiver: Receiver) -> Self {
        Self { callable, receiver }
    }

    /// The receiver the function was found on.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Call on the bound receiver.
    pub fn call(&self, args: Vec<Value>, tracker: &Tracker) -> Result<Value> {
        self.call_with(self.receiver.clone(), args, None, tracker)
    }

    /// Call on a different receiver.
    pub fn call_with(
        &self,
        receiver: Receiver,
        args: Vec<Value>,
        view: Option<View>,
        tracker: &Tracker,
    ) -> Result<Value> {
        let invocation = Invocation::new(receiver, args)
            .with_view(view)
            .with_tracker(tracker.clone());
        self.invoke(&invocation)
    }

    /// Run with a prepared invocation.
    pub fn invoke(&self, invocation: &Invocation) -> Result<Value> {
        (self.callable)(invocation)
    }

    /// Check if two bound functions share the same callable.
    pub fn same_callable(&self, other: &BoundFunction) -> bool {
        Arc::ptr_eq(&self.callable, &other.callable)
    }
}

impl fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFunction")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// What a lookup walk found.
#[derive(Clone, Debug)]
pub enum Resolved {
    Function(BoundFunction),
    Value(Value),
}

impl Resolved {
    pub fn as_function(&self) -> Option<&BoundFunction> {
        match self {
            Resolved::Function(function) => Some(function),
            Resolved::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Function(_) => None,
        }
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
    fn methods_win_over_helpers_and_properties() {
        let mut table = CapabilityTable::new();
        table.define_property("title", "static");
        table.define_helper("title", constant(json!("helper")));
        assert!(matches!(table.resolve("title"), Some(Capability::Helper(_))));

        table.define_method("title", constant(json!("method")));
        let resolved = table.resolve("title").unwrap();
        assert!(matches!(resolved, Capability::Method(_)));

        let invocation = Invocation::new(Receiver::empty(), vec![]);
        assert_eq!(resolved.callable().unwrap()(&invocation).unwrap(), json!("method"));
    }

    #[test]
    fn extended_table_overrides_inherited_entries() {
        let mut base = CapabilityTable::new();
        base.define_method("greet", constant(json!("base")));
        base.define_method("leave", constant(json!("bye")));

        let mut own = CapabilityTable::new();
        own.define_method("greet", constant(json!("sub")));

        let table = base.extended(&own);
        let greet = table.method("greet").unwrap();
        let invocation = Invocation::new(Receiver::empty(), vec![]);
        assert_eq!(greet(&invocation).unwrap(), json!("sub"));
        assert!(table.method("leave").is_some());
        assert_eq!(table.method_names().collect::<Vec<_>>(), vec!["greet", "leave"]);
        assert!(base.method("greet").is_some());
    }

    #[test]
    fn all_args_appends_options() {
        let invocation = Invocation::new(Receiver::empty(), vec![json!(1), json!(2)])
            .with_options(Some(json!({"x": 1})));
        assert_eq!(invocation.all_args(), vec![json!(1), json!(2), json!({"x": 1})]);
        assert_eq!(invocation.arg(5), &Value::Null);
    }

    #[test]
    fn bound_function_passes_receiver() {
        let callable: Callable = Arc::new(|invocation: &Invocation| {
            Ok(invocation.receiver().data().cloned().unwrap_or(Value::Null))
        });
        let bound = BoundFunction::new(callable, Receiver::Data(json!({"a": 1})));
        assert_eq!(bound.call(vec![], &Tracker::untracked()).unwrap(), json!({"a": 1}));
        assert_eq!(
            bound
                .call_with(Receiver::empty(), vec![], None, &Tracker::untracked())
                .unwrap(),
            json!({})
        );
    }
}
