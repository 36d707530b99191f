//! Blog resource types and the payloads used to fill them.

pub mod author;
pub mod comment;
pub mod post;

pub use author::*;
pub use comment::*;
pub use post::*;
