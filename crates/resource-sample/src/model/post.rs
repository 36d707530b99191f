use resource_framework::{AttributeMapBuilder, Model, ScalarType};
use serde::{Deserialize, Serialize};

/// A blog post.
///
/// # Relationships
/// - `author`: the [`Author`](super::Author) who wrote it (`belongsTo`)
/// - `comments`: its [`Comment`](super::Comment)s, stored inline with the post (`hasMany`)
///
/// Adding or removing a comment marks the post dirty, so the next
/// `save_record` on the post sends the new comment list.
pub struct Post;

impl Model for Post {
    const NAME: &'static str = "Post";

    fn declare(attrs: &mut AttributeMapBuilder) {
        attrs
            .attr("title", ScalarType::String)
            .attr("body", ScalarType::String)
            .attr("published", ScalarType::Boolean)
            .attr("published_at", ScalarType::Date)
            .belongs_to("author", "Author")
            .has_many("comments", "Comment");
    }
}

/// Payload for drafting a new post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub body: String,
}

/// Partial update of a post. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
