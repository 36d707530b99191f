//! # Resource Classes
//!
//! A [`ResourceClass`] is the static side of one registered resource type: it
//! constructs [`Resource`]s and [`ResourceCollection`]s of that type and runs
//! the type-level fetch operations.
//!
//! | Operation        | Request                 | Populates                         |
//! |------------------|-------------------------|-----------------------------------|
//! | `find(key)`      | `GET /{plural}/{key}`   | a new resource (`find_by_id`)     |
//! | `find(params)`   | `GET /{plural}?params`  | a new collection (`find_all`)     |
//!
//! Both return immediately. The returned entity tracks the request in
//! `current_request`; its state flips to loaded once the response arrives,
//! and a failure is recorded in `is_error` / `errors` rather than returned.

use crate::adapter::Adapter;
use crate::attribute::{AttributeDescriptor, AttributeMap};
use crate::collection::ResourceCollection;
use crate::error::ResourceError;
use crate::model::ResourceType;
use crate::registry::Registry;
use crate::request::{Method, Payload, RequestParams};
use crate::resource::Resource;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Argument of [`ResourceClass::find`].
///
/// Scalars are primary keys; anything else (objects, arrays, null) is a query
/// for many resources, including an empty object.
#[derive(Debug, Clone, PartialEq)]
pub enum FindQuery {
    Key(Payload),
    Params(Payload),
}

impl From<Value> for FindQuery {
    fn from(value: Value) -> Self {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => FindQuery::Key(value),
            other => FindQuery::Params(other),
        }
    }
}

macro_rules! key_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FindQuery {
            fn from(key: $ty) -> Self {
                FindQuery::Key(Value::from(key))
            }
        })*
    };
}

key_from!(i32, i64, u32, u64, &str, String);

/// Result of [`ResourceClass::find`].
#[derive(Debug, Clone)]
pub enum Found {
    One(Resource),
    Many(ResourceCollection),
}

impl Found {
    pub fn into_one(self) -> Option<Resource> {
        match self {
            Found::One(resource) => Some(resource),
            Found::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<ResourceCollection> {
        match self {
            Found::Many(collection) => Some(collection),
            Found::One(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct ResourceClass {
    registry: Arc<Registry>,
    ty: Arc<ResourceType>,
}

impl ResourceClass {
    pub(crate) fn new(registry: Arc<Registry>, ty: Arc<ResourceType>) -> Self {
        Self { registry, ty }
    }

    pub fn name(&self) -> &str {
        self.ty.name()
    }

    pub fn resource_name(&self) -> &str {
        self.ty.resource_name()
    }

    pub fn resource_name_plural(&self) -> &str {
        self.ty.resource_name_plural()
    }

    pub fn primary_key(&self) -> &str {
        self.ty.primary_key()
    }

    pub fn attribute_map(&self) -> &AttributeMap {
        self.ty.attribute_map()
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        self.registry.adapter()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Class on the other side of a relationship descriptor.
    pub fn related(&self, descriptor: &AttributeDescriptor) -> Option<ResourceClass> {
        self.related_class(descriptor).ok()
    }

    /// Like [`related`](Self::related), naming the missing type on failure.
    pub fn related_class(
        &self,
        descriptor: &AttributeDescriptor,
    ) -> Result<ResourceClass, ResourceError> {
        let target = descriptor
            .target_type()
            .ok_or_else(|| ResourceError::UnknownAttribute {
                resource: self.name().to_string(),
                attribute: descriptor.name.clone(),
            })?;
        self.registry.class_named(target)
    }

    pub fn is(&self, other: &ResourceClass) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty)
    }

    /// A new, observable resource with its relationships instantiated.
    pub fn create(&self) -> Resource {
        Resource::new(self.clone(), true, true)
    }

    /// A resource that registers no observers and never tracks changes.
    pub fn create_unobserved(&self) -> Resource {
        Resource::new(self.clone(), false, false)
    }

    /// A new, empty, observable collection of this type.
    pub fn collection(&self) -> ResourceCollection {
        ResourceCollection::new(self.clone(), None, true)
    }

    pub fn find(&self, query: impl Into<FindQuery>) -> Found {
        match query.into() {
            FindQuery::Key(key) => Found::One(self.find_by_id(key)),
            FindQuery::Params(params) => Found::Many(self.find_all(params)),
        }
    }

    #[tracing::instrument(skip(self, params), fields(resource = %self.resource_name()))]
    pub fn find_all(&self, params: Payload) -> ResourceCollection {
        let collection = self.collection();
        let probe = self.create_unobserved();

        let data = match params {
            Value::Null => None,
            Value::Object(object) if object.is_empty() => None,
            other => Some(other),
        };
        let handle = probe.dispatch(
            RequestParams {
                method: Method::Get,
                data,
            },
            false,
        );
        collection.track_request(&handle);

        let plural = self.resource_name_plural().to_string();
        let adapter = self.adapter().clone();
        let (on_done, on_fail, on_always) =
            (collection.clone(), collection.clone(), collection.clone());
        handle
            .done(move |payload| {
                let items = payload
                    .get(&plural)
                    .or_else(|| payload.is_array().then_some(payload));
                let Some(items) = items else {
                    warn!(resource = %plural, "Response is missing the plural envelope");
                    on_done.record_error(json!({
                        "error": format!("response has no `{plural}` key")
                    }));
                    return;
                };
                match on_done.deserialize_many(items) {
                    Ok(()) => {
                        on_done.set_meta(adapter.extract_meta(payload));
                        on_done.clear_errors();
                        info!(resource = %plural, count = on_done.len(), "Loaded collection");
                    }
                    Err(error) => {
                        warn!(resource = %plural, %error, "Failed to deserialize collection");
                        on_done.record_error(json!({ "error": error.to_string() }));
                    }
                }
            })
            .fail(move |payload| on_fail.record_error(payload.clone()))
            .always(move |_| on_always.finish_load());

        collection
    }

    #[tracing::instrument(skip_all, fields(resource = %self.resource_name()))]
    pub fn find_by_id(&self, id: impl Into<Payload>) -> Resource {
        let id = id.into();
        debug!(%id, "Fetching resource");
        let resource = self.create();
        let mut data = Map::new();
        data.insert(self.primary_key().to_string(), id);
        let handle = resource.request(RequestParams::get().with_data(Value::Object(data)));

        let singular = self.resource_name().to_string();
        let (on_done, on_fail, on_always) = (resource.clone(), resource.clone(), resource.clone());
        handle
            .done(move |payload| {
                let body = payload.get(&singular).unwrap_or(payload);
                match on_done.deserialize(body) {
                    Ok(()) => {
                        on_done.clear_errors();
                        on_done.mark_loaded();
                        info!(resource = %singular, id = %on_done.primary_key(), "Loaded resource");
                    }
                    Err(error) => {
                        warn!(resource = %singular, %error, "Failed to deserialize resource");
                        on_done.record_error(json!({ "error": error.to_string() }));
                    }
                }
            })
            .fail(move |payload| on_fail.record_error(payload.clone()))
            .always(move |_| on_always.finish_round_trip());

        resource
    }
}

impl fmt::Debug for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClass")
            .field("name", &self.name())
            .field("plural", &self.resource_name_plural())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_query_overload() {
        assert_eq!(FindQuery::from(5), FindQuery::Key(json!(5)));
        assert_eq!(FindQuery::from("intro"), FindQuery::Key(json!("intro")));
        assert_eq!(FindQuery::from(json!(true)), FindQuery::Key(json!(true)));
        assert_eq!(FindQuery::from(json!({})), FindQuery::Params(json!({})));
        assert_eq!(FindQuery::from(json!(null)), FindQuery::Params(json!(null)));
        assert_eq!(
            FindQuery::from(json!({"tag": "rust"})),
            FindQuery::Params(json!({"tag": "rust"}))
        );
    }
}
