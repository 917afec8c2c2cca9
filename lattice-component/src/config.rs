//! Configuration
//!
//! Settings shared by the registry, the renderer and the reactive runtime.
//! Every field has a default, so a partial JSON document is valid.

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, Result};

/// Component layer configuration.
///
/// ```rust,ignore
/// let config = Config::from_json_str(r#"{ "default_mount": "#app" }"#)?;
/// assert!(config.normalize_template_names);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mount point used by `Component::insert` when no target is given.
    pub default_mount: String,

    /// Retry template lookups with the camel-cased name.
    pub normalize_template_names: bool,

    /// Upper bound on passes in one flush. Computations still invalidated
    /// when the limit is reached are not run; they stay queued for the next
    /// flush, so a render that keeps invalidating itself advances one
    /// limit's worth of passes per flush instead of looping forever.
    pub max_flush_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_mount: "body".to_string(),
            normalize_template_names: true,
            max_flush_passes: 100,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ComponentError::Config(err.to_string()))?;
        if config.max_flush_passes == 0 {
            return Err(ComponentError::Config(
                "max_flush_passes must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = Config::from_json_str(r##"{ "default_mount": "#app" }"##).unwrap();
        assert_eq!(config.default_mount, "#app");
        assert!(config.normalize_template_names);
        assert_eq!(config.max_flush_passes, 100);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Config::from_json_str("{ default_mount").unwrap_err();
        assert_eq!(err.code(), "COMPONENT_CONFIG");
    }

    #[test]
    fn rejects_zero_flush_passes() {
        assert!(Config::from_json_str(r#"{ "max_flush_passes": 0 }"#).is_err());
    }
}
