//! # Resource Framework
//!
//! Client-side bindings for REST resources. A [`Resource`] is a local object
//! that mirrors one remote entity: it knows whether it is new, dirty, saving,
//! loaded or in error, and it talks to the server through a pluggable
//! [`Adapter`]. Collections of resources ([`ResourceCollection`]) carry the
//! same state, and changes anywhere in a resource graph propagate up to the
//! entity that owns them.
//!
//! ## Architecture Overview
//!
//! The crate is split into three layers:
//!
//! 1. **Type Layer** ([`Model`], [`Registry`]) - declared attributes, primary
//!    keys and endpoint names, computed once at startup
//! 2. **Instance Layer** ([`Resource`], [`ResourceCollection`]) - attribute
//!    storage, change tracking, state flags and the request lifecycle
//! 3. **Wire Layer** ([`Adapter`], [`Codec`], [`Transport`]) - payload
//!    encoding and request dispatch
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_framework::memory::MemoryServer;
//! use resource_framework::{AttributeMapBuilder, Model, Registry, RestAdapter, ScalarType};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Post;
//!
//! impl Model for Post {
//!     const NAME: &'static str = "Post";
//!     fn declare(attrs: &mut AttributeMapBuilder) {
//!         attrs.attr("title", ScalarType::String);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (mut server, transport) = MemoryServer::new(32);
//!     server.register_collection("posts", "post");
//!     tokio::spawn(server.run());
//!
//!     let adapter = Arc::new(RestAdapter::new("mem://", Arc::new(transport.clone())));
//!     let registry = Registry::builder(adapter).register::<Post>().build().unwrap();
//!     let posts = registry.class::<Post>().unwrap();
//!
//!     // Create and save
//!     let post = posts.create();
//!     post.set("title", json!("Hello")).unwrap();
//!     assert!(post.is_new() && post.is_dirty());
//!     post.save_record().wait().await.unwrap();
//!     assert!(!post.is_new() && !post.is_dirty());
//!
//!     // Load it back
//!     let loaded = posts.find_by_id(post.primary_key());
//!     loaded.wait_for_request().await;
//!     assert_eq!(loaded.get("title").unwrap(), json!("Hello"));
//!
//!     transport.shutdown().await;
//! }
//! ```
//!
//! ## Change Tracking
//!
//! Setting an attribute, or pushing into a `hasMany` collection, marks the
//! owning resource dirty. A resource that is neither new nor loaded stays
//! clean: it has nothing to be dirty relative to. See [`resource`] and
//! [`collection`] for the propagation rules.
//!
//! ## Request Lifecycle
//!
//! `save_record`, `delete_record` and the class-level `find` operations
//! return immediately with a [`RequestHandle`]. Failures never surface as
//! `Err`: they are recorded in the entity's `errors` and delivered to `fail`
//! continuations. [`ResourceError`] is reserved for local, programmatic
//! mistakes such as unknown attributes or mistyped values.
//!
//! ## Concurrency Model
//!
//! - Resources are `Send + Sync` handles over shared, mutex-guarded state
//! - No entity ever holds two locks at once; observers and continuations run
//!   with no lock held
//! - Responses settle handles from Tokio tasks, so continuations run on the
//!   runtime's worker threads
//! - Change notification cycles are cut per thread; notifications raised
//!   concurrently on other threads are always delivered
//!
//! ## Testing
//!
//! The [`mock`] module provides scripted and channel-driven transports, and
//! [`memory`] a small in-process REST server for end-to-end tests.

pub mod adapter;
pub mod attribute;
pub mod class;
pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod mock;
pub mod model;
pub mod naming;
pub mod registry;
pub mod request;
pub mod resource;
pub mod state;
pub mod tracker;
pub mod tracing;
pub mod transport;

// Re-export core types for convenience
pub use adapter::{Adapter, RestAdapter};
pub use attribute::{AttributeDescriptor, AttributeKind, AttributeMap, AttributeMapBuilder, ScalarType};
pub use class::{FindQuery, Found, ResourceClass};
pub use codec::{Codec, JsonCodec};
pub use collection::ResourceCollection;
pub use config::ResourceConfig;
pub use error::ResourceError;
pub use events::ResourceEvent;
pub use model::{Model, ResourceType};
pub use registry::{Registry, RegistryBuilder};
pub use request::{Method, Outcome, Payload, RequestHandle, RequestParams};
pub use resource::Resource;
pub use state::ResourceState;
pub use tracker::{ChangeObserver, ObserverId};
pub use transport::{Transport, TransportError, TransportRequest};
