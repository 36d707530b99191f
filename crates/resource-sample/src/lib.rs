//! # Resource Sample Library
//!
//! A small blog (authors, posts, comments) built on `resource_framework` and
//! served by its in-memory REST backend. Exposed as a library for
//! integration testing.

pub mod error;
pub mod lifecycle;
pub mod model;
