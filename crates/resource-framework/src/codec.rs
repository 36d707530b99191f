//! # Wire Codec
//!
//! A [`Codec`] translates between a [`Resource`] and its JSON representation.
//! It works on the bare object; the singular/plural envelopes are handled by
//! the resource and class operations.
//!
//! [`JsonCodec`] is the default flat encoding:
//!
//! | Attribute kind | Encoded as                                        |
//! |----------------|---------------------------------------------------|
//! | scalar         | the value itself                                  |
//! | `belongsTo`    | the related resource's primary key (or `null`)    |
//! | `hasMany`      | an array of encoded elements                      |
//!
//! A null primary key is omitted so that new resources post without one.
//! Decoding is lenient: unknown keys are ignored, `belongsTo` accepts either a
//! bare key or an embedded object, and `hasMany` arrays may hold bare keys.

use crate::attribute::AttributeKind;
use crate::error::ResourceError;
use crate::request::Payload;
use crate::resource::Resource;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub trait Codec: Send + Sync + 'static {
    /// Encodes the resource. Must not mutate it.
    fn serialize(&self, resource: &Resource) -> Payload;

    /// Applies `payload` to `resource`, overriding its primary key when the
    /// payload carries one.
    fn deserialize(&self, resource: &Resource, payload: &Payload) -> Result<(), ResourceError>;

    /// Side-channel metadata of a response envelope.
    fn extract_meta(&self, payload: &Payload) -> Option<Payload> {
        payload.get("meta").filter(|meta| !meta.is_null()).cloned()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn encode(&self, resource: &Resource, seen: &mut HashSet<usize>) -> Payload {
        // A resource reached twice through hasMany chains is written as its key.
        if !seen.insert(resource.key()) {
            return resource.primary_key();
        }

        let class = resource.class();
        let mut object = Map::new();
        for descriptor in class.attribute_map().iter() {
            let name = descriptor.name.as_str();
            let value = match descriptor.kind {
                AttributeKind::Scalar => resource.get(name).unwrap_or(Value::Null),
                AttributeKind::BelongsTo => match resource.peek_belongs_to(name) {
                    Ok(Some(related)) => related.primary_key(),
                    _ => Value::Null,
                },
                AttributeKind::HasMany => match resource.has_many(name) {
                    Ok(collection) => Value::Array(
                        collection
                            .to_vec()
                            .iter()
                            .map(|element| self.encode(element, seen))
                            .collect(),
                    ),
                    Err(_) => Value::Array(Vec::new()),
                },
            };
            if name == class.primary_key() && value.is_null() {
                continue;
            }
            object.insert(name.to_string(), value);
        }
        seen.remove(&resource.key());
        Value::Object(object)
    }

    fn decode_belongs_to(
        &self,
        resource: &Resource,
        name: &str,
        value: &Value,
    ) -> Result<(), ResourceError> {
        if value.is_null() {
            return resource.set_belongs_to(name, None);
        }

        let current = resource.belongs_to(name)?;
        let related_class = current.class().clone();
        let incoming_key = match value {
            Value::Object(object) => object
                .get(related_class.primary_key())
                .cloned()
                .unwrap_or(Value::Null),
            scalar => scalar.clone(),
        };
        let current_key = current.primary_key();
        let reuse = current_key.is_null() || incoming_key.is_null() || current_key == incoming_key;
        let target = if reuse {
            current
        } else {
            related_class.create()
        };

        match value {
            Value::Object(_) => {
                self.deserialize(&target, value)?;
                target.mark_loaded();
            }
            scalar => target.assign_primary_key(scalar.clone()),
        }

        if !reuse {
            resource.set_belongs_to(name, Some(target))?;
        }
        Ok(())
    }
}

impl Codec for JsonCodec {
    fn serialize(&self, resource: &Resource) -> Payload {
        self.encode(resource, &mut HashSet::new())
    }

    fn deserialize(&self, resource: &Resource, payload: &Payload) -> Result<(), ResourceError> {
        let object = match payload {
            Value::Object(object) => object,
            Value::Null => return Ok(()),
            other => {
                return Err(ResourceError::MalformedPayload {
                    resource: resource.class().resource_name().to_string(),
                    reason: format!("expected an object, got {other}"),
                })
            }
        };

        let class = resource.class().clone();
        let primary_key = class.primary_key();
        if let Some(key) = object.get(primary_key).filter(|key| !key.is_null()) {
            resource.assign_primary_key(key.clone());
        }

        for descriptor in class.attribute_map().iter() {
            let name = descriptor.name.as_str();
            if name == primary_key {
                continue;
            }
            let Some(value) = object.get(name) else {
                continue;
            };
            match descriptor.kind {
                AttributeKind::Scalar => resource.set(name, value.clone())?,
                AttributeKind::BelongsTo => self.decode_belongs_to(resource, name, value)?,
                AttributeKind::HasMany if value.is_null() => {}
                AttributeKind::HasMany => resource.has_many(name)?.deserialize_many(value)?,
            }
        }
        Ok(())
    }
}
