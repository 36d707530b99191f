//! # Type Registry
//!
//! The registry is built once at startup and holds every resource type the
//! application knows about, together with the [`Adapter`] and
//! [`ResourceConfig`] they share. Building it is the only place attribute maps
//! are computed; afterwards types are immutable and shared by `Arc`.
//!
//! ```rust
//! use resource_framework::mock::MockTransport;
//! use resource_framework::{AttributeMapBuilder, Model, Registry, ResourceConfig, ScalarType};
//!
//! struct Person;
//!
//! impl Model for Person {
//!     const NAME: &'static str = "Person";
//!     fn declare(attrs: &mut AttributeMapBuilder) {
//!         attrs.attr("name", ScalarType::String);
//!     }
//! }
//!
//! let mock = MockTransport::new();
//! let registry = Registry::builder(mock.adapter("http://api.test"))
//!     .config(ResourceConfig::new().with_plural("person", "people"))
//!     .register::<Person>()
//!     .build()
//!     .unwrap();
//!
//! let people = registry.class::<Person>().unwrap();
//! assert_eq!(people.resource_name_plural(), "people");
//! ```

use crate::adapter::Adapter;
use crate::attribute::AttributeMapBuilder;
use crate::class::ResourceClass;
use crate::config::ResourceConfig;
use crate::error::ResourceError;
use crate::model::{Model, ResourceType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type Declaration = Box<dyn FnOnce(&mut AttributeMapBuilder)>;

struct PendingType {
    name: String,
    primary_key: String,
    declare: Declaration,
}

pub struct RegistryBuilder {
    adapter: Arc<dyn Adapter>,
    config: ResourceConfig,
    pending: Vec<PendingType>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: ResourceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register<M: Model>(self) -> Self {
        self.register_with_key(M::NAME, M::PRIMARY_KEY, M::declare)
    }

    /// Registers a type without a backing Rust type.
    pub fn register_type<F>(self, name: &str, declare: F) -> Self
    where
        F: FnOnce(&mut AttributeMapBuilder) + 'static,
    {
        self.register_with_key(name, "id", declare)
    }

    fn register_with_key<F>(mut self, name: &str, primary_key: &str, declare: F) -> Self
    where
        F: FnOnce(&mut AttributeMapBuilder) + 'static,
    {
        self.pending.push(PendingType {
            name: name.to_string(),
            primary_key: primary_key.to_string(),
            declare: Box::new(declare),
        });
        self
    }

    /// Defines every registered type and checks that each relationship
    /// points at a registered type.
    pub fn build(self) -> Result<Arc<Registry>, ResourceError> {
        let mut types = HashMap::with_capacity(self.pending.len());
        for pending in self.pending {
            if types.contains_key(&pending.name) {
                return Err(ResourceError::DuplicateType(pending.name));
            }
            let ty = ResourceType::define(
                &pending.name,
                &pending.primary_key,
                pending.declare,
                &self.config,
            );
            debug!(
                resource = ty.resource_name(),
                plural = ty.resource_name_plural(),
                primary_key = ty.primary_key(),
                attributes = ty.attribute_map().len(),
                "Defined resource type"
            );
            types.insert(pending.name, Arc::new(ty));
        }

        for ty in types.values() {
            for descriptor in ty.attribute_map().relationships() {
                let target = descriptor.target_type().unwrap_or_default();
                if !types.contains_key(target) {
                    return Err(ResourceError::UnresolvedRelationship {
                        resource: ty.name().to_string(),
                        attribute: descriptor.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        info!(types = types.len(), "Resource registry ready");
        Ok(Arc::new(Registry {
            adapter: self.adapter,
            config: self.config,
            types,
        }))
    }
}

pub struct Registry {
    adapter: Arc<dyn Adapter>,
    config: ResourceConfig,
    types: HashMap<String, Arc<ResourceType>>,
}

impl Registry {
    pub fn builder(adapter: Arc<dyn Adapter>) -> RegistryBuilder {
        RegistryBuilder {
            adapter,
            config: ResourceConfig::default(),
            pending: Vec::new(),
        }
    }

    pub fn class<M: Model>(self: &Arc<Self>) -> Result<ResourceClass, ResourceError> {
        self.class_named(M::NAME)
    }

    pub fn class_named(self: &Arc<Self>, name: &str) -> Result<ResourceClass, ResourceError> {
        let ty = self
            .types
            .get(name)
            .ok_or_else(|| ResourceError::UnknownType(name.to_string()))?;
        Ok(ResourceClass::new(self.clone(), ty.clone()))
    }

    pub fn resource_type(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.types.get(name)
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.type_names())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ScalarType;
    use crate::mock::MockTransport;

    struct Post;

    impl Model for Post {
        const NAME: &'static str = "Post";

        fn declare(attrs: &mut AttributeMapBuilder) {
            attrs
                .attr("title", ScalarType::String)
                .has_many("comments", "Comment");
        }
    }

    struct Comment;

    impl Model for Comment {
        const NAME: &'static str = "Comment";

        fn declare(attrs: &mut AttributeMapBuilder) {
            attrs.attr("body", ScalarType::String).belongs_to("post", "Post");
        }
    }

    fn adapter() -> Arc<dyn Adapter> {
        MockTransport::new().adapter("http://api.test")
    }

    #[test]
    fn test_build_resolves_classes() {
        let registry = Registry::builder(adapter())
            .register::<Post>()
            .register::<Comment>()
            .build()
            .unwrap();

        assert_eq!(registry.type_names(), ["Comment", "Post"]);
        let posts = registry.class::<Post>().unwrap();
        assert_eq!(posts.resource_name(), "post");
        assert!(matches!(
            registry.class_named("Tag"),
            Err(ResourceError::UnknownType(name)) if name == "Tag"
        ));
    }

    #[test]
    fn test_unresolved_relationship_is_rejected() {
        let result = Registry::builder(adapter()).register::<Post>().build();
        assert!(matches!(
            result,
            Err(ResourceError::UnresolvedRelationship { target, .. }) if target == "Comment"
        ));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let result = Registry::builder(adapter())
            .register::<Comment>()
            .register::<Post>()
            .register_type("Post", |attrs| {
                attrs.attr("title", ScalarType::String);
            })
            .build();
        assert!(matches!(result, Err(ResourceError::DuplicateType(name)) if name == "Post"));
    }

    #[test]
    fn test_config_applies_regardless_of_call_order() {
        let registry = Registry::builder(adapter())
            .register_type("Tag", |attrs| {
                attrs.attr("label", ScalarType::String);
            })
            .config(ResourceConfig::new().with_primary_key("tag", "label"))
            .build()
            .unwrap();
        let tags = registry.class_named("Tag").unwrap();
        assert_eq!(tags.primary_key(), "label");
        assert_eq!(tags.attribute_map().len(), 1);
    }
}
