use resource_framework::{Payload, ResourceError};

/// Errors surfaced by [`BlogSystem`](crate::lifecycle::BlogSystem) operations.
///
/// The framework records remote failures on the resource itself; the blog
/// system turns them into [`BlogError::Remote`] for callers that await.
#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Request for {resource} failed: {errors}")]
    Remote { resource: String, errors: Payload },

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Payload for {0} must be a JSON object")]
    NotAnObject(String),
}
