//! Render output.
//!
//! A render function returns [`Content`]; the renderer turns it into
//! rendered nodes and child views.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::component::Component;
use crate::error::Result;
use crate::reactive::Tracker;
use crate::template::Template;

use super::node::{DataFn, View};

/// What a render pass produced.
#[derive(Clone, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    /// A view to render as a child.
    View(View),
    /// A template to render in a fresh child view.
    Template(Template),
    /// A component whose view becomes a child; the parent keeps the
    /// component alive and destroys it when the child is torn down.
    Component(Component),
    /// A template included with arguments and block content.
    Inclusion(Inclusion),
    Sequence(Vec<Content>),
}

impl Content {
    /// Text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    /// Check if nothing would be rendered.
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Empty => true,
            Content::Sequence(items) => items.iter().all(Content::is_empty),
            _ => false,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<Content>> for Content {
    fn from(items: Vec<Content>) -> Self {
        Content::Sequence(items)
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => f.write_str("Empty"),
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::View(view) => f.debug_tuple("View").field(view).finish(),
            Content::Template(template) => {
                f.debug_tuple("Template").field(&template.name()).finish()
            }
            Content::Component(component) => {
                f.debug_tuple("Component").field(&component.kind()).finish()
            }
            Content::Inclusion(inclusion) => f.debug_tuple("Inclusion").field(inclusion).finish(),
            Content::Sequence(items) => f.debug_list().entries(items).finish(),
        }
    }
}

/// A template included at a call site.
///
/// With arguments, the renderer wraps the template view in an argument
/// scope, which is where [`crate::lookup::get_inclusion_arguments`] finds
/// them.
#[derive(Clone)]
pub struct Inclusion {
    pub(crate) template: Template,
    pub(crate) args: Option<Arc<DataFn>>,
    pub(crate) content: Option<Template>,
    pub(crate) else_content: Option<Template>,
}

impl Inclusion {
    /// Include `template` without arguments.
    pub fn new(template: &Template) -> Self {
        Self {
            template: template.clone(),
            args: None,
            content: None,
            else_content: None,
        }
    }

    /// Reactive inclusion arguments.
    pub fn with_args<F>(mut self, args: F) -> Self
    where
        F: Fn(&Tracker) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.args = Some(Arc::new(args));
        self
    }

    /// Fixed inclusion arguments.
    pub fn with_args_value(self, args: Value) -> Self {
        self.with_args(move |_| Ok(Some(args.clone())))
    }

    /// Block content.
    pub fn with_content(mut self, content: &Template) -> Self {
        self.content = Some(content.clone());
        self
    }

    /// Else-block content.
    pub fn with_else(mut self, else_content: &Template) -> Self {
        self.else_content = Some(else_content.clone());
        self
    }
}

impl From<Inclusion> for Content {
    fn from(inclusion: Inclusion) -> Self {
        Content::Inclusion(inclusion)
    }
}

impl fmt::Debug for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inclusion")
            .field("template", &self.template.name())
            .field("has_args", &self.args.is_some())
            .field("content", &self.content.as_ref().map(Template::name))
            .field("else_content", &self.else_content.as_ref().map(Template::name))
            .finish()
    }
}
