use resource_framework::{AttributeMapBuilder, Model, ScalarType};
use serde::{Deserialize, Serialize};

pub struct Comment;

impl Model for Comment {
    const NAME: &'static str = "Comment";

    fn declare(attrs: &mut AttributeMapBuilder) {
        attrs
            .attr("commenter", ScalarType::String)
            .attr("body", ScalarType::String);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreate {
    pub commenter: String,
    pub body: String,
}
