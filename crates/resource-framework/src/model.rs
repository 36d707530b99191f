//! # Model Trait
//!
//! The `Model` trait is the static registration step for a resource type: it
//! names the type and declares its attributes and relationships. Registering a
//! model with [`Registry::builder`](crate::registry::Registry::builder) turns
//! those declarations into a [`ResourceType`], computed exactly once per type.
//!
//! Models are plain marker types. Instance state lives in
//! [`Resource`](crate::resource::Resource), not in the implementing struct.
//!
//! ```rust
//! use resource_framework::{AttributeMapBuilder, Model, ScalarType};
//!
//! struct Post;
//!
//! impl Model for Post {
//!     const NAME: &'static str = "Post";
//!
//!     fn declare(attrs: &mut AttributeMapBuilder) {
//!         attrs
//!             .attr("title", ScalarType::String)
//!             .belongs_to("author", "Author")
//!             .has_many("comments", "Comment");
//!     }
//! }
//! ```

use crate::attribute::{AttributeMap, AttributeMapBuilder};
use crate::config::ResourceConfig;
use crate::naming;

pub trait Model: 'static {
    /// Type name, as referenced by relationship declarations (e.g. `"BlogPost"`).
    const NAME: &'static str;

    /// Primary-key attribute, unless overridden in the config.
    const PRIMARY_KEY: &'static str = "id";

    /// Declares the attributes and relationships of this type.
    fn declare(attrs: &mut AttributeMapBuilder);
}

/// Registered, immutable description of one resource type.
#[derive(Debug)]
pub struct ResourceType {
    name: String,
    resource_name: String,
    plural: String,
    primary_key: String,
    attributes: AttributeMap,
}

impl ResourceType {
    pub(crate) fn define(
        name: &str,
        declared_primary_key: &str,
        declare: impl FnOnce(&mut AttributeMapBuilder),
        config: &ResourceConfig,
    ) -> Self {
        let resource_name = naming::decamelize(name);
        let primary_key = config
            .primary_key_for(&resource_name)
            .unwrap_or(declared_primary_key)
            .to_string();
        let plural = config
            .plural_for(&resource_name)
            .map(str::to_string)
            .unwrap_or_else(|| naming::pluralize(&resource_name));

        let mut builder = AttributeMapBuilder::new();
        declare(&mut builder);

        Self {
            name: name.to_string(),
            attributes: builder.build(&primary_key),
            resource_name,
            plural,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Singular envelope key and resource name, e.g. `blog_post`.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Plural envelope key and endpoint name, e.g. `blog_posts`.
    pub fn resource_name_plural(&self) -> &str {
        &self.plural
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn attribute_map(&self) -> &AttributeMap {
        &self.attributes
    }
}
