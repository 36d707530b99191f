//! # Observability & Tracing
//!
//! The framework logs through the `tracing` crate; [`setup_tracing`] installs
//! a compact `fmt` subscriber filtered by the `RUST_LOG` environment variable.
//!
//! ## What Gets Traced
//!
//! - **Requests**: one `debug` line per dispatched request (`method`, `path`)
//! - **Persistence**: `info` on created, updated, deleted and loaded resources
//! - **Failures**: `warn` with the recorded error payload
//! - **Change tracking**: `trace` when a resource or collection turns dirty
//! - **Memory server**: startup, every handled request, shutdown
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run
//!
//! # Every request and type definition
//! RUST_LOG=debug cargo run
//!
//! # Dirtiness propagation as well
//! RUST_LOG=resource_framework=trace,info cargo run
//! ```
//!
//! With `RUST_LOG=info`, saving a new post and loading it back reads:
//!
//! ```text
//! INFO Resource registry ready types=3
//! INFO Memory server started collections=3
//! INFO Created collection=posts id=1
//! INFO Saved resource resource="post" id=1 event=didCreate
//! INFO Loaded resource resource=post id=1
//! ```

/// Installs the global subscriber. Call once, at program start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
