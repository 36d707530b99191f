//! # Resource Sample
//!
//! A blog client built on the resource framework.
//!
//! ## Core Components
//!
//! - **[model]**: Resource declarations ([`Author`], [`Post`], [`Comment`]) and their input payloads.
//! - **[lifecycle]**: [`BlogSystem`], which wires the models to an in-memory REST server.
//! - **[error]**: [`BlogError`](resource_sample::error::BlogError), the error callers see.
//!
//! ## Quick Start
//!
//! The entry point below walks through a typical session:
//! 1. Starting the [`BlogSystem`].
//! 2. Creating an author and a post.
//! 3. Editing, commenting on and publishing the post.
//! 4. Querying and deleting.
//!
//! [model]: resource_sample::model
//! [lifecycle]: resource_sample::lifecycle
//! [error]: resource_sample::error
//! [`Author`]: resource_sample::model::Author
//! [`Post`]: resource_sample::model::Post
//! [`Comment`]: resource_sample::model::Comment

use resource_framework::tracing::setup_tracing;
use resource_sample::lifecycle::BlogSystem;
use resource_sample::model::{AuthorCreate, CommentCreate, PostCreate, PostUpdate};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting blog client");

    let system = BlogSystem::new().map_err(|e| e.to_string())?;

    let span = tracing::info_span!("author_creation");
    let author = async {
        info!("Creating author");
        system
            .create_author(AuthorCreate {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            })
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    info!(author_id = %author.primary_key(), "Author created");

    let span = tracing::info_span!("post_drafting");
    let post = async {
        let post = system
            .create_post(
                &author,
                PostCreate {
                    title: "Notes on the engine".to_string(),
                    body: "First draft".to_string(),
                },
            )
            .await?;
        system
            .update_post(
                &post,
                PostUpdate {
                    body: Some("Second draft".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        system
            .add_comment(
                &post,
                CommentCreate {
                    commenter: "Charles".to_string(),
                    body: "Looking forward to it".to_string(),
                },
            )
            .await?;
        system.publish(&post, "1843-10-01T00:00:00Z").await?;
        Ok::<_, resource_sample::error::BlogError>(post)
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    info!(post_id = %post.primary_key(), "Post published");

    match system.posts_by(&author).await {
        Ok(posts) => info!(count = posts.len(), "Listed posts by author"),
        Err(e) => error!(error = %e, "Listing posts failed"),
    }

    // Deleting twice: the second attempt is refused locally.
    for attempt in 1..=2 {
        match system.delete_post(&post).await {
            Ok(()) => info!(attempt, "Post deleted"),
            Err(e) => error!(attempt, error = %e, "Post deletion failed"),
        }
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
