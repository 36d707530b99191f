//! # Transport
//!
//! The lowest seam of the framework: something that can carry one REST
//! request to a server and bring back the decoded JSON response. The
//! [`RestAdapter`](crate::adapter::RestAdapter) builds [`TransportRequest`]s
//! and bridges the returned future into a
//! [`RequestHandle`](crate::request::RequestHandle).
//!
//! Implementations in this crate:
//!
//! - [`MemoryTransport`](crate::memory::MemoryTransport), backed by the
//!   in-memory REST server,
//! - [`MockTransport`](crate::mock::MockTransport) and
//!   [`ChannelTransport`](crate::mock::ChannelTransport), for tests.

use crate::request::{Method, Payload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub method: Method,
    pub base_url: String,
    /// `/{plural}` or `/{plural}/{id}`.
    pub path: String,
    /// Query parameters as a JSON object (GET only).
    pub query: Option<Payload>,
    pub body: Option<Payload>,
}

impl TransportRequest {
    pub fn new(method: Method, base_url: &str, path: String) -> Self {
        Self {
            method,
            base_url: base_url.trim_end_matches('/').to_string(),
            path,
            query: None,
            body: None,
        }
    }

    /// Full URL including the query string. Values are rendered unescaped.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.base_url, self.path);
        if let Some(Value::Object(query)) = &self.query {
            let pairs: Vec<String> = query
                .iter()
                .map(|(key, value)| format!("{key}={}", render_segment(value)))
                .collect();
            if !pairs.is_empty() {
                url.push('?');
                url.push_str(&pairs.join("&"));
            }
        }
        url
    }

    /// Path segments without the leading slash.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Renders a JSON value as a URL path or query segment.
pub fn render_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Server responded with status {status}")]
    Status { status: u16, body: Payload },

    #[error("Network failure: {0}")]
    Network(String),
}

impl TransportError {
    /// The raw failure payload recorded in a resource's `errors`.
    pub fn into_payload(self) -> Payload {
        match self {
            TransportError::Status { status, body } => json!({ "status": status, "body": body }),
            TransportError::Network(reason) => json!({ "status": 0, "error": reason }),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Payload, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_rendering() {
        let mut request = TransportRequest::new(Method::Get, "http://api.test/", "/posts".into());
        assert_eq!(request.url(), "http://api.test/posts");

        request.query = Some(json!({"author_id": 3, "tag": "rust"}));
        assert_eq!(request.url(), "http://api.test/posts?author_id=3&tag=rust");
        assert_eq!(request.segments(), ["posts"]);
    }

    #[test]
    fn test_error_payloads() {
        let status = TransportError::Status {
            status: 404,
            body: json!({"error": "not found"}),
        };
        assert_eq!(
            status.into_payload(),
            json!({"status": 404, "body": {"error": "not found"}})
        );
        assert_eq!(
            TransportError::Network("refused".into()).into_payload(),
            json!({"status": 0, "error": "refused"})
        );
    }
}
