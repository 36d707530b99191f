//! # Attribute Descriptors
//!
//! Every resource type carries an [`AttributeMap`]: the ordered table of its
//! declared attributes and relationships. The table is produced once, when the
//! type is registered, from the declarations a [`Model`](crate::model::Model)
//! writes into an [`AttributeMapBuilder`]. Instances never share the table's
//! storage; each one allocates its own slots from it.

use serde_json::Value;
use std::fmt;

/// What kind of property a descriptor declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Scalar,
    HasMany,
    BelongsTo,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Scalar => "scalar",
            AttributeKind::HasMany => "hasMany",
            AttributeKind::BelongsTo => "belongsTo",
        };
        f.write_str(name)
    }
}

/// Value domain of a scalar attribute. `Null` is accepted by every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    /// ISO-8601 text; stored as a JSON string.
    Date,
    Any,
}

impl ScalarType {
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ScalarType::Any, _) => true,
            (ScalarType::String | ScalarType::Date, Value::String(_)) => true,
            (ScalarType::Number, Value::Number(_)) => true,
            (ScalarType::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::Any => "any",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Scalar(ScalarType),
    /// Name of the registered resource type on the other side of a relationship.
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeKind,
    pub value_type: ValueType,
}

impl AttributeDescriptor {
    /// The related type name, for `hasMany` and `belongsTo` descriptors.
    pub fn target_type(&self) -> Option<&str> {
        match &self.value_type {
            ValueType::Resource(name) => Some(name),
            ValueType::Scalar(_) => None,
        }
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.value_type {
            ValueType::Scalar(ty) => Some(ty),
            ValueType::Resource(_) => None,
        }
    }
}

/// Immutable, ordered attribute table of one resource type.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    descriptors: Vec<AttributeDescriptor>,
}

impl AttributeMap {
    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.descriptors.iter()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.kind != AttributeKind::Scalar)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Collects attribute declarations for one type.
///
/// Redeclaring a name replaces the earlier declaration in place.
#[derive(Debug, Default)]
pub struct AttributeMapBuilder {
    descriptors: Vec<AttributeDescriptor>,
}

impl AttributeMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(&mut self, name: &str, ty: ScalarType) -> &mut Self {
        self.declare(name, AttributeKind::Scalar, ValueType::Scalar(ty))
    }

    pub fn belongs_to(&mut self, name: &str, target: &str) -> &mut Self {
        self.declare(
            name,
            AttributeKind::BelongsTo,
            ValueType::Resource(target.to_string()),
        )
    }

    pub fn has_many(&mut self, name: &str, target: &str) -> &mut Self {
        self.declare(
            name,
            AttributeKind::HasMany,
            ValueType::Resource(target.to_string()),
        )
    }

    fn declare(&mut self, name: &str, kind: AttributeKind, value_type: ValueType) -> &mut Self {
        let descriptor = AttributeDescriptor {
            name: name.to_string(),
            kind,
            value_type,
        };
        match self.descriptors.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        self
    }

    /// Freezes the table. The primary key is prepended as an untyped scalar
    /// when the declarations did not include it.
    pub(crate) fn build(mut self, primary_key: &str) -> AttributeMap {
        if !self.descriptors.iter().any(|d| d.name == primary_key) {
            self.descriptors.insert(
                0,
                AttributeDescriptor {
                    name: primary_key.to_string(),
                    kind: AttributeKind::Scalar,
                    value_type: ValueType::Scalar(ScalarType::Any),
                },
            );
        }
        AttributeMap {
            descriptors: self.descriptors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_key_is_injected_once() {
        let mut builder = AttributeMapBuilder::new();
        builder
            .attr("title", ScalarType::String)
            .has_many("comments", "Comment");
        let map = builder.build("id");

        assert_eq!(map.len(), 3);
        assert_eq!(map.index_of("id"), Some(0));
        assert_eq!(map.get("comments").unwrap().target_type(), Some("Comment"));

        let mut builder = AttributeMapBuilder::new();
        builder.attr("slug", ScalarType::String);
        let map = builder.build("slug");
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("slug").unwrap().scalar_type(),
            Some(ScalarType::String)
        );
    }

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let mut builder = AttributeMapBuilder::new();
        builder
            .attr("title", ScalarType::String)
            .attr("body", ScalarType::String)
            .attr("title", ScalarType::Any);
        let map = builder.build("id");

        let names: Vec<_> = map.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["id", "title", "body"]);
        assert_eq!(map.get("title").unwrap().scalar_type(), Some(ScalarType::Any));
    }

    #[test]
    fn test_scalar_type_accepts() {
        assert!(ScalarType::String.accepts(&json!("a")));
        assert!(ScalarType::String.accepts(&Value::Null));
        assert!(!ScalarType::String.accepts(&json!(1)));
        assert!(ScalarType::Number.accepts(&json!(1.5)));
        assert!(ScalarType::Boolean.accepts(&json!(true)));
        assert!(ScalarType::Date.accepts(&json!("2024-01-01T00:00:00Z")));
        assert!(ScalarType::Any.accepts(&json!({"nested": [1, 2]})));
    }
}
