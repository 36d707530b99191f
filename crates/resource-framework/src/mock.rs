//! # Mock Transports & Testing Guide
//!
//! Resources never talk to a server directly; every request goes through the
//! [`Transport`] behind the [`RestAdapter`]. Replacing that transport is how
//! the framework is tested.
//!
//! ## Which transport to use
//!
//! | Feature | [`MockTransport`] | [`ChannelTransport`] | [`MemoryServer`](crate::memory::MemoryServer) |
//! |---------|-------------------|----------------------|-----------------------------|
//! | **Responses** | Scripted up front | Sent by the test, one by one | Computed from a real store |
//! | **Timing** | Immediate | Whenever the test answers | Immediate |
//! | **Use Case** | Request shape, error injection | In-flight state (`is_saving`, coalescing) | End-to-end flows |
//!
//! <details>
//! <summary><b>Pattern 1: Scripted responses</b></summary>
//!
//! ```rust
//! use resource_framework::mock::MockTransport;
//! use resource_framework::{Method, Registry, ScalarType};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect(Method::Get, "/posts/1")
//!         .return_ok(json!({"post": {"id": 1, "title": "Hello"}}));
//!
//!     let registry = Registry::builder(mock.adapter("http://api.test"))
//!         .register_type("Post", |attrs| {
//!             attrs.attr("title", ScalarType::String);
//!         })
//!         .build()
//!         .unwrap();
//!
//!     let post = registry.class_named("Post").unwrap().find_by_id(1);
//!     post.wait_for_request().await;
//!     assert_eq!(post.get("title").unwrap(), json!("Hello"));
//!     mock.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Answering by hand</b></summary>
//!
//! [`create_mock_transport`] hands back the receiving end of the channel, so a
//! test can look at a resource while its request is still outstanding and
//! then decide how the server responds.
//!
//! ```rust
//! use resource_framework::mock::{create_mock_transport, expect_request};
//! use resource_framework::{Method, Registry, ScalarType};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (transport, mut requests) = create_mock_transport(8);
//!     let registry = Registry::builder(transport.adapter("http://api.test"))
//!         .register_type("Post", |attrs| {
//!             attrs.attr("title", ScalarType::String);
//!         })
//!         .build()
//!         .unwrap();
//!     let posts = registry.class_named("Post").unwrap();
//!
//!     let post = posts.create();
//!     post.set("title", json!("Draft")).unwrap();
//!     let save = post.save_record();
//!     assert!(post.is_saving());
//!
//!     let pending = expect_request(&mut requests).await.unwrap();
//!     assert_eq!(pending.request.method, Method::Post);
//!     pending.respond_ok(json!({"post": {"id": 7, "title": "Draft"}}));
//!
//!     save.wait().await.unwrap();
//!     assert!(!post.is_saving());
//!     assert_eq!(post.primary_key(), json!(7));
//! }
//! ```
//! </details>
//!
//! ## Testing Failure Scenarios
//!
//! Failures are ordinary responses: `return_status` scripts an HTTP error and
//! `return_err` any [`TransportError`], including network failures that are
//! hard to reproduce against a real server.

use crate::adapter::{Adapter, RestAdapter};
use crate::request::{Method, Payload};
use crate::transport::{Transport, TransportError, TransportRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    method: Method,
    path: String,
    response: Result<Payload, TransportError>,
}

#[derive(Default)]
struct MockState {
    expectations: Mutex<VecDeque<Expectation>>,
    requests: Mutex<Vec<TransportRequest>>,
    mismatches: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A transport that answers from a queue of scripted expectations.
///
/// Expectations are consumed in order. A request that does not match the
/// next expectation (or arrives when none is left) fails with
/// [`TransportError::Network`] and is reported by [`verify`](Self::verify).
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next request to be `method path`.
    pub fn expect(&self, method: Method, path: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            path: path.to_string(),
            state: self.state.clone(),
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    /// A [`RestAdapter`] over this transport.
    pub fn adapter(&self, base_url: &str) -> Arc<dyn Adapter> {
        Arc::new(RestAdapter::new(base_url, self.transport()))
    }

    /// Panics unless every expectation was met by a matching request.
    pub fn verify(&self) {
        let mismatches = lock(&self.state.mismatches);
        if !mismatches.is_empty() {
            panic!("Unexpected requests: {}", mismatches.join("; "));
        }
        let remaining = lock(&self.state.expectations);
        if !remaining.is_empty() {
            let pending: Vec<String> = remaining
                .iter()
                .map(|e| format!("{} {}", e.method, e.path))
                .collect();
            panic!(
                "Not all expectations were met. {} remaining: {}",
                remaining.len(),
                pending.join(", ")
            );
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<Payload, TransportError> {
        lock(&self.state.requests).push(request.clone());
        let expectation = lock(&self.state.expectations).pop_front();

        match expectation {
            Some(e) if e.method == request.method && e.path == request.path => e.response,
            Some(e) => {
                let reason = format!(
                    "expected {} {}, got {} {}",
                    e.method, e.path, request.method, request.path
                );
                lock(&self.state.mismatches).push(reason.clone());
                Err(TransportError::Network(reason))
            }
            None => {
                let reason = format!("no expectation for {} {}", request.method, request.path);
                lock(&self.state.mismatches).push(reason.clone());
                Err(TransportError::Network(reason))
            }
        }
    }
}

/// Builder returned by [`MockTransport::expect`].
pub struct ExpectationBuilder {
    method: Method,
    path: String,
    state: Arc<MockState>,
}

impl ExpectationBuilder {
    /// Responds with a successful payload.
    pub fn return_ok(self, payload: Payload) {
        self.push(Ok(payload));
    }

    /// Responds with an error.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    /// Responds with an HTTP error status.
    pub fn return_status(self, status: u16, body: Payload) {
        self.push(Err(TransportError::Status { status, body }));
    }

    fn push(self, response: Result<Payload, TransportError>) {
        lock(&self.state.expectations).push_back(Expectation {
            method: self.method,
            path: self.path,
            response,
        });
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// A request waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: TransportRequest,
    respond_to: oneshot::Sender<Result<Payload, TransportError>>,
}

impl PendingRequest {
    pub fn respond_ok(self, payload: Payload) {
        let _ = self.respond_to.send(Ok(payload));
    }

    pub fn respond_err(self, error: TransportError) {
        let _ = self.respond_to.send(Err(error));
    }

    pub fn respond_status(self, status: u16, body: Payload) {
        self.respond_err(TransportError::Status { status, body });
    }
}

/// A transport that forwards every request to a channel the test controls.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    sender: mpsc::Sender<PendingRequest>,
}

impl ChannelTransport {
    pub fn adapter(&self, base_url: &str) -> Arc<dyn Adapter> {
        Arc::new(RestAdapter::new(base_url, Arc::new(self.clone())))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, request: TransportRequest) -> Result<Payload, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(PendingRequest {
                request,
                respond_to,
            })
            .await
            .map_err(|_| TransportError::Network("request receiver closed".into()))?;
        response
            .await
            .map_err(|_| TransportError::Network("request dropped without a response".into()))?
    }
}

/// Creates a [`ChannelTransport`] and the receiver its requests arrive on.
///
/// Dropping a [`PendingRequest`] without answering it fails the request with
/// a network error.
pub fn create_mock_transport(buffer_size: usize) -> (ChannelTransport, mpsc::Receiver<PendingRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ChannelTransport { sender }, receiver)
}

/// Waits for the next request on a [`create_mock_transport`] receiver.
pub async fn expect_request(receiver: &mut mpsc::Receiver<PendingRequest>) -> Option<PendingRequest> {
    receiver.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, path: &str) -> TransportRequest {
        TransportRequest::new(method, "http://api.test", path.to_string())
    }

    #[tokio::test]
    async fn test_mock_transport_with_expectations() {
        let mock = MockTransport::new();
        mock.expect(Method::Post, "/posts").return_ok(json!({"post": {"id": 1}}));
        mock.expect(Method::Get, "/posts/1")
            .return_status(404, json!({"error": "not found"}));

        let transport = mock.transport();
        let created = transport.send(request(Method::Post, "/posts")).await;
        assert_eq!(created, Ok(json!({"post": {"id": 1}})));

        let missing = transport.send(request(Method::Get, "/posts/1")).await;
        assert!(matches!(missing, Err(TransportError::Status { status: 404, .. })));

        assert_eq!(mock.requests().len(), 2);
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected requests")]
    async fn test_mock_transport_reports_mismatch() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/posts").return_ok(json!({"posts": []}));

        let result = mock.send(request(Method::Delete, "/posts/1")).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
        mock.verify();
    }

    #[test]
    #[should_panic(expected = "1 remaining")]
    fn test_verify_fails_on_unmet_expectations() {
        let mock = MockTransport::new();
        mock.expect(Method::Get, "/posts").return_ok(json!({"posts": []}));
        mock.verify();
    }

    #[tokio::test]
    async fn test_channel_transport() {
        let (transport, mut receiver) = create_mock_transport(4);

        let call = tokio::spawn(async move { transport.send(request(Method::Put, "/posts/2")).await });

        let pending = expect_request(&mut receiver)
            .await
            .expect("Expected a request");
        assert_eq!(pending.request.path, "/posts/2");
        pending.respond_ok(json!({"post": {"id": 2}}));

        assert_eq!(call.await.unwrap(), Ok(json!({"post": {"id": 2}})));
    }

    #[tokio::test]
    async fn test_dropped_pending_request_is_a_network_error() {
        let (transport, mut receiver) = create_mock_transport(4);

        let call = tokio::spawn(async move { transport.send(request(Method::Get, "/posts")).await });
        drop(expect_request(&mut receiver).await);

        assert!(matches!(call.await.unwrap(), Err(TransportError::Network(_))));
    }
}
