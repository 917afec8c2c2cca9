//! Component Errors
//!
//! Every failure in the component layer is local and synchronous: it is
//! returned to the immediate caller and never retried automatically.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`AlreadyCreated`](ComponentError::AlreadyCreated) | `COMPONENT_ALREADY_CREATED` | Yes (destroy first) |
//! | [`MissingMountPoint`](ComponentError::MissingMountPoint) | `COMPONENT_MISSING_MOUNT_POINT` | Yes |
//! | [`TemplateNotFound`](ComponentError::TemplateNotFound) | `COMPONENT_TEMPLATE_NOT_FOUND` | No |
//! | [`Lookup`](ComponentError::Lookup) | `COMPONENT_LOOKUP` | No |
//! | [`Precondition`](ComponentError::Precondition) | `COMPONENT_PRECONDITION` | No |
//! | [`Destroyed`](ComponentError::Destroyed) | `COMPONENT_DESTROYED` | Yes (recreate) |
//! | [`RegistrationConflict`](ComponentError::RegistrationConflict) | `COMPONENT_REGISTRATION_CONFLICT` | No |
//! | [`Handler`](ComponentError::Handler) | `COMPONENT_HANDLER` | No |
//! | [`Config`](ComponentError::Config) | `COMPONENT_CONFIG` | No |

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ComponentError>;

/// Errors raised by the component layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// `create_view` was called while the component already owns a live view.
    #[error("component view is already created for {kind:?}")]
    AlreadyCreated { kind: String },

    /// `insert` could not resolve its target mount point.
    #[error("no element to insert into: mount point {selector:?} does not exist")]
    MissingMountPoint { selector: String },

    /// A template name resolved under neither its original nor its normalized form.
    #[error("couldn't find a template named {name:?} or {normalized:?}")]
    TemplateNotFound { name: String, normalized: String },

    /// A named function, helper or component could not be resolved.
    #[error("{0}")]
    Lookup(String),

    /// Invalid arguments to a search or registration primitive.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The component was destroyed and has not been created again.
    #[error("component {kind:?} has been destroyed")]
    Destroyed { kind: String },

    /// A component name is already registered to a different class.
    #[error("component name {name:?} is already registered to a different class")]
    RegistrationConflict { name: String },

    /// A user-supplied method, helper or event handler failed.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ComponentError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyCreated { .. } => "COMPONENT_ALREADY_CREATED",
            Self::MissingMountPoint { .. } => "COMPONENT_MISSING_MOUNT_POINT",
            Self::TemplateNotFound { .. } => "COMPONENT_TEMPLATE_NOT_FOUND",
            Self::Lookup(_) => "COMPONENT_LOOKUP",
            Self::Precondition(_) => "COMPONENT_PRECONDITION",
            Self::Destroyed { .. } => "COMPONENT_DESTROYED",
            Self::RegistrationConflict { .. } => "COMPONENT_REGISTRATION_CONFLICT",
            Self::Handler(_) => "COMPONENT_HANDLER",
            Self::Config(_) => "COMPONENT_CONFIG",
        }
    }

    /// Whether the caller can recover by changing state and trying again.
    ///
    /// Lifecycle errors recover through `destroy` followed by re-creation;
    /// a missing mount point recovers once the mount point exists.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCreated { .. } | Self::MissingMountPoint { .. } | Self::Destroyed { .. }
        )
    }

    /// Build a lookup error with a formatted message.
    pub(crate) fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    /// Build a precondition error with a formatted message.
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}
