//! Named templates.
//!
//! A [`Template`] is a render function with a name and its own capability
//! table. Lookups consult the table of every template view they walk past.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::capability::{CapabilityTable, Invocation};
use crate::error::Result;
use crate::reactive::Tracker;
use crate::view::{Content, RenderFn, View};

/// A renderable, named template.
#[derive(Clone)]
pub struct Template {
    inner: Arc<TemplateInner>,
}

struct TemplateInner {
    name: String,
    render: Arc<RenderFn>,
    capabilities: CapabilityTable,
}

impl Template {
    /// Create a template from a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Self::builder(name).build(render)
    }

    /// A template that renders fixed text.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(name, move |_, _| Ok(Content::Text(text.clone())))
    }

    /// Start a template with helpers or properties.
    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            name: name.into(),
            capabilities: CapabilityTable::new(),
        }
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn render_fn(&self) -> Arc<RenderFn> {
        self.inner.render.clone()
    }

    /// Helpers and properties declared on this template.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.inner.capabilities
    }

    /// Check if two handles refer to the same template.
    pub fn ptr_eq(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.inner.name)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

/// Builder for templates with helpers and static properties.
pub struct TemplateBuilder {
    name: String,
    capabilities: CapabilityTable,
}

impl TemplateBuilder {
    /// Declare a helper.
    pub fn helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&Invocation) -> Result<Value> + Send + Sync + 'static,
    {
        self.capabilities.define_helper(name, helper);
        self
    }

    /// Declare a static property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.capabilities.define_property(name, value);
        self
    }

    /// Finish with the render function.
    pub fn build<F>(self, render: F) -> Template
    where
        F: Fn(&View, &Tracker) -> Result<Content> + Send + Sync + 'static,
    {
        Template {
            inner: Arc::new(TemplateInner {
                name: self.name,
                render: Arc::new(render),
                capabilities: self.capabilities,
            }),
        }
    }
}

/// Camel-case a template name: `"user-profile"` becomes `"userProfile"`.
///
/// `_`, `-`, `.` and whitespace separate words; the first word keeps its
/// case.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == '.' || ch.is_whitespace() {
            upper_next = !normalized.is_empty();
            continue;
        }
        if upper_next {
            normalized.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            normalized.push(ch);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use serde_json::json;

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_name("user-profile"), "userProfile");
        assert_eq!(normalize_name("user_profile_card"), "userProfileCard");
        assert_eq!(normalize_name("a.b c"), "aBC");
        assert_eq!(normalize_name("_leading"), "leading");
        assert_eq!(normalize_name("Plain"), "Plain");
    }

    #[test]
    fn builder_declares_capabilities() {
        let template = Template::builder("Card")
            .property("title", "hello")
            .helper("shout", |_| Ok(json!("HEY")))
            .build(|_, _| Ok(Content::Empty));

        assert_eq!(template.name(), "Card");
        assert!(matches!(
            template.capabilities().resolve("title"),
            Some(Capability::Property(v)) if v == json!("hello")
        ));
        assert!(matches!(
            template.capabilities().resolve("shout"),
            Some(Capability::Helper(_))
        ));
        assert!(template.capabilities().resolve("missing").is_none());
    }
}
