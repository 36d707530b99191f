//! # Adapters
//!
//! The [`Adapter`] is the single collaborator the resource core talks to. It
//! owns the wire format (`serialize`, `deserialize`, `extract_meta`) and the
//! dispatch of requests (`request`). Resources and classes hold it as
//! `Arc<dyn Adapter>` through their [`Registry`](crate::registry::Registry).
//!
//! [`RestAdapter`] is the stock implementation: a [`Codec`] for the payloads
//! and a [`Transport`] for the requests, addressing endpoints as
//! `{base_url}/{plural}` and `{base_url}/{plural}/{id}`.

use crate::codec::{Codec, JsonCodec};
use crate::error::ResourceError;
use crate::request::{Method, Payload, RequestHandle, RequestParams};
use crate::resource::Resource;
use crate::transport::{render_segment, Transport, TransportError, TransportRequest};
use std::sync::Arc;
use tracing::debug;

pub trait Adapter: Send + Sync {
    fn serialize(&self, resource: &Resource) -> Payload;

    fn deserialize(&self, resource: &Resource, payload: &Payload) -> Result<(), ResourceError>;

    fn extract_meta(&self, payload: &Payload) -> Option<Payload>;

    /// Issues a request against `/{resource_name_plural}[/{id}]`. The returned
    /// handle settles when the response arrives.
    fn request(
        &self,
        params: RequestParams,
        resource_name_plural: &str,
        id: Option<&Payload>,
    ) -> RequestHandle;
}

pub struct RestAdapter<C: Codec = JsonCodec> {
    base_url: String,
    codec: C,
    transport: Arc<dyn Transport>,
}

impl RestAdapter<JsonCodec> {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self::with_codec(base_url, JsonCodec, transport)
    }
}

impl<C: Codec> RestAdapter<C> {
    pub fn with_codec(base_url: impl Into<String>, codec: C, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            codec,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_request(
        &self,
        params: RequestParams,
        resource_name_plural: &str,
        id: Option<&Payload>,
    ) -> TransportRequest {
        let path = match id {
            Some(id) => format!("/{resource_name_plural}/{}", render_segment(id)),
            None => format!("/{resource_name_plural}"),
        };
        let mut request = TransportRequest::new(params.method, &self.base_url, path);
        match params.method {
            Method::Get => request.query = params.data,
            _ => request.body = params.data,
        }
        request
    }
}

impl<C: Codec> Adapter for RestAdapter<C> {
    fn serialize(&self, resource: &Resource) -> Payload {
        self.codec.serialize(resource)
    }

    fn deserialize(&self, resource: &Resource, payload: &Payload) -> Result<(), ResourceError> {
        self.codec.deserialize(resource, payload)
    }

    fn extract_meta(&self, payload: &Payload) -> Option<Payload> {
        self.codec.extract_meta(payload)
    }

    fn request(
        &self,
        params: RequestParams,
        resource_name_plural: &str,
        id: Option<&Payload>,
    ) -> RequestHandle {
        let request = self.build_request(params, resource_name_plural, id);
        debug!(method = %request.method, path = %request.path, "Dispatching request");

        let transport = self.transport.clone();
        RequestHandle::spawn(async move {
            transport
                .send(request)
                .await
                .map_err(TransportError::into_payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    #[test]
    fn test_build_request_routes_data() {
        let mock = MockTransport::new();
        let adapter = RestAdapter::new("http://api.test", mock.transport());

        let get = adapter.build_request(
            RequestParams::get().with_data(json!({"tag": "rust"})),
            "posts",
            None,
        );
        assert_eq!(get.path, "/posts");
        assert_eq!(get.query, Some(json!({"tag": "rust"})));
        assert!(get.body.is_none());

        let put = adapter.build_request(
            RequestParams::new(Method::Put).with_data(json!({"post": {"title": "x"}})),
            "posts",
            Some(&json!(4)),
        );
        assert_eq!(put.path, "/posts/4");
        assert_eq!(put.body, Some(json!({"post": {"title": "x"}})));
        assert!(put.query.is_none());

        let by_slug = adapter.build_request(RequestParams::get(), "posts", Some(&json!("hello")));
        assert_eq!(by_slug.url(), "http://api.test/posts/hello");
    }

    #[tokio::test]
    async fn test_request_settles_from_transport() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/posts/1")
            .return_ok(json!({"post": {"id": 1}}));
        mock.expect(Method::Delete, "/posts/1")
            .return_status(500, json!({"error": "boom"}));
        let adapter = RestAdapter::new("http://api.test", mock.transport());

        let ok = adapter.request(RequestParams::get(), "posts", Some(&json!(1)));
        assert_eq!(ok.wait().await, Ok(json!({"post": {"id": 1}})));

        let err = adapter.request(RequestParams::new(Method::Delete), "posts", Some(&json!(1)));
        assert_eq!(
            err.wait().await,
            Err(json!({"status": 500, "body": {"error": "boom"}}))
        );
        mock.verify();
    }
}
