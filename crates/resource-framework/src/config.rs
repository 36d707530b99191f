//! # Configuration
//!
//! Per-type naming overrides consumed when types are registered. The config is
//! an explicit value handed to [`RegistryBuilder::config`](crate::registry::RegistryBuilder::config);
//! nothing is looked up globally.
//!
//! Keys are resource names (`blog_post`, not `BlogPost`).
//!
//! ```rust
//! use resource_framework::ResourceConfig;
//!
//! let config = ResourceConfig::from_json(r#"{
//!     "primary_keys": { "post": "slug" },
//!     "plurals": { "person": "people" }
//! }"#).unwrap();
//!
//! assert_eq!(config.primary_key_for("post"), Some("slug"));
//! assert_eq!(config.plural_for("person"), Some("people"));
//! ```

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Resource name to primary-key attribute name.
    pub primary_keys: HashMap<String, String>,
    /// Resource name to plural endpoint name.
    pub plurals: HashMap<String, String>,
}

impl ResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config document. Missing sections default to empty.
    pub fn from_json(input: &str) -> Result<Self, ResourceError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn with_primary_key(mut self, resource: &str, key: &str) -> Self {
        self.primary_keys.insert(resource.to_string(), key.to_string());
        self
    }

    pub fn with_plural(mut self, resource: &str, plural: &str) -> Self {
        self.plurals.insert(resource.to_string(), plural.to_string());
        self
    }

    pub fn primary_key_for(&self, resource: &str) -> Option<&str> {
        self.primary_keys.get(resource).map(String::as_str)
    }

    pub fn plural_for(&self, resource: &str) -> Option<&str> {
        self.plurals.get(resource).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_defaults_missing_sections() {
        let config = ResourceConfig::from_json(r#"{ "plurals": { "person": "people" } }"#).unwrap();
        assert!(config.primary_keys.is_empty());
        assert_eq!(config.plural_for("person"), Some("people"));
        assert_eq!(config.plural_for("post"), None);
    }

    #[test]
    fn test_invalid_document_is_a_config_error() {
        let result = ResourceConfig::from_json("{ not json");
        assert!(matches!(result, Err(ResourceError::Config(_))));
    }

    #[test]
    fn test_fluent_overrides() {
        let config = ResourceConfig::new()
            .with_primary_key("post", "slug")
            .with_plural("octopus", "octopi");
        assert_eq!(config.primary_key_for("post"), Some("slug"));
        assert_eq!(config.plural_for("octopus"), Some("octopi"));
    }
}
