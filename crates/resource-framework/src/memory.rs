//! # In-Memory REST Backend
//!
//! [`MemoryServer`] is a small REST server that lives in a Tokio task. It owns
//! a `collection → id → object` store and processes requests **sequentially**
//! from an `mpsc` channel, so the store needs no locking. [`MemoryTransport`]
//! is the client half: a cloneable [`Transport`] that sends each request over
//! the channel and awaits the reply on a `oneshot`.
//!
//! ## Routes
//!
//! | Request                 | Response                                        |
//! |-------------------------|-------------------------------------------------|
//! | `GET /{plural}`         | `{plural: [...], meta: {total}}`, query = equality filters |
//! | `GET /{plural}/{id}`    | `{singular: {...}}`                             |
//! | `POST /{plural}`        | `{singular: {...}}` with a new sequential id    |
//! | `PUT /{plural}/{id}`    | `{singular: {...}}`, fields merged              |
//! | `DELETE /{plural}/{id}` | `{}`                                            |
//!
//! Request bodies may be wrapped in the singular envelope or bare. Unknown
//! collections and ids answer `404 {"error": "not found"}`.
//!
//! ## Usage
//!
//! ```rust
//! use resource_framework::memory::MemoryServer;
//! use resource_framework::transport::{Transport, TransportRequest};
//! use resource_framework::Method;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (mut server, transport) = MemoryServer::new(16);
//!     server.register_collection("posts", "post");
//!     server.seed("posts", json!({"title": "Hello"}));
//!     let handle = tokio::spawn(server.run());
//!
//!     let request = TransportRequest::new(Method::Get, "mem://", "/posts/1".into());
//!     let response = transport.send(request).await.unwrap();
//!     assert_eq!(response, json!({"post": {"id": 1, "title": "Hello"}}));
//!
//!     transport.shutdown().await;
//!     handle.await.unwrap();
//! }
//! ```

use crate::request::{Method, Payload};
use crate::transport::{render_segment, Transport, TransportError, TransportRequest};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// One-shot reply channel of the server.
pub type Reply = oneshot::Sender<Result<Payload, TransportError>>;

#[derive(Debug)]
pub enum ServerMessage {
    Request {
        request: TransportRequest,
        respond_to: Reply,
    },
    /// Stops the server even while transports are still alive.
    Shutdown,
}

#[derive(Debug)]
struct Table {
    singular: String,
    rows: BTreeMap<u64, Map<String, Value>>,
    next_id: u64,
}

impl Table {
    fn insert(&mut self, mut fields: Map<String, Value>) -> &Map<String, Value> {
        let id = self.next_id;
        self.next_id += 1;
        fields.insert("id".to_string(), Value::from(id));
        self.rows.entry(id).or_insert(fields)
    }

    fn wrap(&self, row: &Map<String, Value>) -> Payload {
        let mut envelope = Map::new();
        envelope.insert(self.singular.clone(), Value::Object(row.clone()));
        Value::Object(envelope)
    }

    /// Accepts `{singular: {...}}` or a bare object; drops any client-sent id.
    fn unwrap_body(&self, body: Option<Payload>) -> Result<Map<String, Value>, TransportError> {
        let body = match body {
            Some(Value::Object(mut object)) => match object.remove(&self.singular) {
                Some(Value::Object(inner)) => inner,
                Some(other) => {
                    object.insert(self.singular.clone(), other);
                    object
                }
                None => object,
            },
            None | Some(Value::Null) => Map::new(),
            Some(_) => return Err(unprocessable("request body must be an object")),
        };
        Ok(body.into_iter().filter(|(key, _)| key != "id").collect())
    }
}

fn not_found() -> TransportError {
    TransportError::Status {
        status: 404,
        body: json!({ "error": "not found" }),
    }
}

fn method_not_allowed() -> TransportError {
    TransportError::Status {
        status: 405,
        body: json!({ "error": "method not allowed" }),
    }
}

fn unprocessable(reason: &str) -> TransportError {
    TransportError::Status {
        status: 422,
        body: json!({ "error": reason }),
    }
}

fn matches_query(row: &Map<String, Value>, query: Option<&Payload>) -> bool {
    let Some(Value::Object(filters)) = query else {
        return true;
    };
    filters.iter().all(|(key, expected)| {
        row.get(key)
            .is_some_and(|actual| actual == expected || render_segment(actual) == render_segment(expected))
    })
}

/// The server half. Build it, register collections, then spawn [`run`](Self::run).
pub struct MemoryServer {
    receiver: mpsc::Receiver<ServerMessage>,
    tables: HashMap<String, Table>,
}

impl MemoryServer {
    /// Creates the server and its transport. `buffer_size` bounds the number
    /// of requests waiting to be processed.
    pub fn new(buffer_size: usize) -> (Self, MemoryTransport) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let server = Self {
            receiver,
            tables: HashMap::new(),
        };
        (server, MemoryTransport { sender })
    }

    pub fn register_collection(&mut self, plural: &str, singular: &str) -> &mut Self {
        self.tables.entry(plural.to_string()).or_insert_with(|| Table {
            singular: singular.to_string(),
            rows: BTreeMap::new(),
            next_id: 1,
        });
        self
    }

    /// Inserts a row before the server starts. Returns the assigned id, or
    /// `None` for an unknown collection or a non-object row.
    pub fn seed(&mut self, plural: &str, row: Payload) -> Option<u64> {
        let table = self.tables.get_mut(plural)?;
        let Value::Object(fields) = row else {
            return None;
        };
        let row = table.insert(fields);
        row.get("id").and_then(Value::as_u64)
    }

    /// Processes requests until shut down or until every transport is dropped.
    pub async fn run(mut self) {
        info!(collections = self.tables.len(), "Memory server started");

        while let Some(message) = self.receiver.recv().await {
            match message {
                ServerMessage::Request {
                    request,
                    respond_to,
                } => {
                    debug!(method = %request.method, path = %request.path, "Request");
                    let result = self.handle(request);
                    if let Err(error) = &result {
                        warn!(%error, "Request failed");
                    }
                    let _ = respond_to.send(result);
                }
                ServerMessage::Shutdown => break,
            }
        }

        let rows: usize = self.tables.values().map(|t| t.rows.len()).sum();
        info!(rows, "Memory server shutdown");
    }

    fn handle(&mut self, request: TransportRequest) -> Result<Payload, TransportError> {
        let (plural, id) = match request.segments().as_slice() {
            [plural] => (plural.to_string(), None),
            [plural, id] => (plural.to_string(), Some(id.parse::<u64>().map_err(|_| not_found())?)),
            _ => return Err(not_found()),
        };
        let table = self.tables.get_mut(&plural).ok_or_else(not_found)?;

        match (request.method, id) {
            (Method::Get, None) => {
                let rows: Vec<Value> = table
                    .rows
                    .values()
                    .filter(|row| matches_query(row, request.query.as_ref()))
                    .map(|row| Value::Object(row.clone()))
                    .collect();
                let total = rows.len();
                let mut envelope = Map::new();
                envelope.insert(plural, Value::Array(rows));
                envelope.insert("meta".to_string(), json!({ "total": total }));
                Ok(Value::Object(envelope))
            }
            (Method::Get, Some(id)) => {
                let row = table.rows.get(&id).ok_or_else(not_found)?;
                Ok(table.wrap(row))
            }
            (Method::Post, None) => {
                let fields = table.unwrap_body(request.body)?;
                let row = table.insert(fields).clone();
                info!(collection = %plural, id = %row["id"], "Created");
                Ok(table.wrap(&row))
            }
            (Method::Put, Some(id)) => {
                let fields = table.unwrap_body(request.body)?;
                let row = table.rows.get_mut(&id).ok_or_else(not_found)?;
                row.extend(fields);
                let row = row.clone();
                info!(collection = %plural, id, "Updated");
                Ok(table.wrap(&row))
            }
            (Method::Delete, Some(id)) => {
                table.rows.remove(&id).ok_or_else(not_found)?;
                info!(collection = %plural, id, size = table.rows.len(), "Deleted");
                Ok(json!({}))
            }
            _ => Err(method_not_allowed()),
        }
    }
}

/// The client half of [`MemoryServer`].
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    sender: mpsc::Sender<ServerMessage>,
}

impl MemoryTransport {
    /// Asks the server to stop after the requests already queued.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(ServerMessage::Shutdown).await;
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: TransportRequest) -> Result<Payload, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ServerMessage::Request {
                request,
                respond_to,
            })
            .await
            .map_err(|_| TransportError::Network("memory server closed".into()))?;
        response
            .await
            .map_err(|_| TransportError::Network("memory server dropped the request".into()))?
    }
}
