use resource_framework::{AttributeMapBuilder, Model, ScalarType};
use serde::{Deserialize, Serialize};

/// A person who writes posts.
///
/// Served from `/authors`; a post refers to its author by primary key.
pub struct Author;

impl Model for Author {
    const NAME: &'static str = "Author";

    fn declare(attrs: &mut AttributeMapBuilder) {
        attrs
            .attr("name", ScalarType::String)
            .attr("email", ScalarType::String);
    }
}

/// Payload for creating a new author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorCreate {
    pub name: String,
    pub email: String,
}
