//! # Framework Errors
//!
//! This module defines the error type for local, programmatic failures of the
//! resource framework: unknown types or attributes, values of the wrong shape,
//! and use of resources that have already been destroyed.
//!
//! Remote failures are deliberately *not* represented here. A failed save,
//! delete or find never surfaces as an `Err`; it is recorded on the resource or
//! collection (`is_error` / `errors`) and delivered to `fail` continuations of
//! the [`RequestHandle`](crate::request::RequestHandle).

use crate::attribute::{AttributeKind, ScalarType};
use serde_json::Value;

/// Errors that can occur within the resource framework itself.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Unknown resource type: {0}")]
    UnknownType(String),

    #[error("Resource type registered twice: {0}")]
    DuplicateType(String),

    #[error("{resource} has no attribute named {attribute}")]
    UnknownAttribute { resource: String, attribute: String },

    #[error("{resource}.{attribute} is a {actual} attribute, not {expected}")]
    KindMismatch {
        resource: String,
        attribute: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },

    #[error("{resource}.{attribute} expects a {expected} value, got {value}")]
    InvalidValue {
        resource: String,
        attribute: String,
        expected: ScalarType,
        value: Value,
    },

    #[error("Expected a {expected} resource, got {actual}")]
    WrongType { expected: String, actual: String },

    #[error("{resource}.{attribute} references unregistered type {target}")]
    UnresolvedRelationship {
        resource: String,
        attribute: String,
        target: String,
    },

    #[error("{0} has been destroyed")]
    Destroyed(String),

    #[error("Malformed payload for {resource}: {reason}")]
    MalformedPayload { resource: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
