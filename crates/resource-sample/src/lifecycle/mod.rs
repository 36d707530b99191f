//! # System Lifecycle & Orchestration
//!
//! Wires the blog's resource types to a backend, and tears the backend down
//! again when the application is done.
//!
//! ## The BlogSystem Pattern
//!
//! [`BlogSystem`] owns everything a running blog needs:
//!
//! ```rust,ignore
//! impl BlogSystem {
//!     pub fn with_config(config: ResourceConfig) -> Result<Self, BlogError> {
//!         // 1. Create the server and the transport that reaches it
//!         let (mut server, transport) = MemoryServer::new(64);
//!
//!         // 2. Register every model once; names and attribute maps are fixed here
//!         let registry = Registry::builder(adapter)
//!             .config(config)
//!             .register::<Author>()
//!             .register::<Post>()
//!             .register::<Comment>()
//!             .build()?;
//!
//!         // 3. Serve one collection per registered type, then start the server
//!         tokio::spawn(server.run());
//!         ...
//!     }
//! }
//! ```
//!
//! Endpoint names come from the registry, so a [`ResourceConfig`] override
//! (for example `with_plural("post", "articles")`) moves both the client and
//! the server to the new path.
//!
//! ## Awaiting Results
//!
//! Framework operations never fail with `Err`; remote failures land on the
//! resource's `errors`. The blog system awaits each request and converts a
//! failure into [`BlogError::Remote`](crate::error::BlogError::Remote), which
//! is what application code usually wants.
//!
//! ## Graceful Shutdown
//!
//! 1. **Send `Shutdown`** - the server stops accepting work
//! 2. **Server drains** - requests already queued are answered
//! 3. **Await completion** - `shutdown` returns once the server task ends
//!
//! ## Observability & Tracing
//!
//! Call [`setup_tracing`](resource_framework::tracing::setup_tracing) once at
//! startup. Every blog operation runs in its own span:
//!
//! ```bash
//! RUST_LOG=info cargo run      # Compact logs
//! RUST_LOG=debug cargo run     # Request and response payloads
//! ```
//!
//! [`ResourceConfig`]: resource_framework::ResourceConfig

pub mod blog_system;

pub use blog_system::*;
