use crate::error::BlogError;
use crate::model::{Author, AuthorCreate, Comment, CommentCreate, Post, PostCreate, PostUpdate};
use resource_framework::memory::{MemoryServer, MemoryTransport};
use resource_framework::{
    Payload, Registry, RequestHandle, Resource, ResourceClass, ResourceCollection, ResourceConfig,
    RestAdapter,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

const BASE_URL: &str = "mem://blog";

/// The whole blog: resource classes wired to a running in-memory server.
pub struct BlogSystem {
    pub authors: ResourceClass,
    pub posts: ResourceClass,
    pub comments: ResourceClass,
    transport: MemoryTransport,
    server: JoinHandle<()>,
}

impl BlogSystem {
    /// Starts the blog with default naming.
    pub fn new() -> Result<Self, BlogError> {
        Self::with_config(ResourceConfig::default())
    }

    /// Starts the blog; `config` can rename endpoints or primary keys.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_config(config: ResourceConfig) -> Result<Self, BlogError> {
        let (mut server, transport) = MemoryServer::new(64);
        let adapter = Arc::new(RestAdapter::new(BASE_URL, Arc::new(transport.clone())));
        let registry = Registry::builder(adapter)
            .config(config)
            .register::<Author>()
            .register::<Post>()
            .register::<Comment>()
            .build()?;

        let authors = registry.class::<Author>()?;
        let posts = registry.class::<Post>()?;
        let comments = registry.class::<Comment>()?;
        for class in [&authors, &posts, &comments] {
            server.register_collection(class.resource_name_plural(), class.resource_name());
        }

        let server = tokio::spawn(server.run());
        info!(types = ?registry.type_names(), "Blog system started");

        Ok(Self {
            authors,
            posts,
            comments,
            transport,
            server,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_author(&self, params: AuthorCreate) -> Result<Resource, BlogError> {
        let author = self.authors.create();
        assign(&author, &params)?;
        settle(&author, author.save_record()).await?;
        Ok(author)
    }

    #[instrument(skip(self, author))]
    pub async fn create_post(
        &self,
        author: &Resource,
        params: PostCreate,
    ) -> Result<Resource, BlogError> {
        let post = self.posts.create();
        assign(&post, &params)?;
        post.set("published", false)?;
        post.set_belongs_to("author", Some(author.clone()))?;
        settle(&post, post.save_record()).await?;
        Ok(post)
    }

    /// Applies `update` and saves. Sends nothing when no field changed.
    #[instrument(skip(self, post), fields(id = %post.primary_key()))]
    pub async fn update_post(&self, post: &Resource, update: PostUpdate) -> Result<(), BlogError> {
        assign(post, &update)?;
        if !post.is_dirty() {
            debug!("Nothing to update");
        }
        settle(post, post.save_record()).await?;
        Ok(())
    }

    #[instrument(skip(self, post), fields(id = %post.primary_key()))]
    pub async fn publish(&self, post: &Resource, published_at: &str) -> Result<(), BlogError> {
        post.set("published", true)?;
        post.set("published_at", published_at)?;
        settle(post, post.save_record()).await?;
        Ok(())
    }

    /// Appends a comment and saves the post that owns it.
    #[instrument(skip(self, post), fields(id = %post.primary_key()))]
    pub async fn add_comment(
        &self,
        post: &Resource,
        params: CommentCreate,
    ) -> Result<Resource, BlogError> {
        let comment = self.comments.create();
        assign(&comment, &params)?;
        post.has_many("comments")?.push(comment)?;
        settle(post, post.save_record()).await?;

        // The save response replaces the comment list with server copies.
        let comments = post.has_many("comments")?;
        let saved = comments.get(comments.len().saturating_sub(1));
        saved.ok_or_else(|| BlogError::Remote {
            resource: "comment".to_string(),
            errors: json!({ "error": "comment missing from save response" }),
        })
    }

    #[instrument(skip(self))]
    pub async fn load_post(&self, id: u64) -> Result<Resource, BlogError> {
        let post = self.posts.find_by_id(id);
        post.wait_for_request().await;
        check(post.class().resource_name(), post.errors())?;
        Ok(post)
    }

    /// Posts written by `author`.
    #[instrument(skip(self, author), fields(author = %author.primary_key()))]
    pub async fn posts_by(&self, author: &Resource) -> Result<ResourceCollection, BlogError> {
        let posts = self.posts.find_all(json!({ "author": author.primary_key() }));
        posts.wait_for_request().await;
        check(posts.class().resource_name_plural(), posts.errors())?;
        info!(count = posts.len(), "Loaded posts by author");
        Ok(posts)
    }

    #[instrument(skip(self))]
    pub async fn published_posts(&self) -> Result<ResourceCollection, BlogError> {
        let posts = self.posts.find_all(json!({ "published": true }));
        posts.wait_for_request().await;
        check(posts.class().resource_name_plural(), posts.errors())?;
        Ok(posts)
    }

    #[instrument(skip(self, post), fields(id = %post.primary_key()))]
    pub async fn delete_post(&self, post: &Resource) -> Result<(), BlogError> {
        settle(post, post.delete_record()).await?;
        Ok(())
    }

    /// Stops the server after in-flight requests and waits for it.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down blog system");
        self.transport.shutdown().await;
        self.server.await.map_err(|e| e.to_string())
    }
}

/// Copies the fields of a serializable payload onto `resource`.
fn assign<T: Serialize>(resource: &Resource, fields: &T) -> Result<(), BlogError> {
    let Value::Object(fields) = serde_json::to_value(fields)? else {
        return Err(BlogError::NotAnObject(
            resource.class().resource_name().to_string(),
        ));
    };
    for (name, value) in fields {
        resource.set(&name, value)?;
    }
    Ok(())
}

async fn settle(resource: &Resource, handle: RequestHandle) -> Result<Payload, BlogError> {
    handle.wait().await.map_err(|errors| BlogError::Remote {
        resource: resource.class().resource_name().to_string(),
        errors,
    })
}

fn check(resource: &str, errors: Option<Payload>) -> Result<(), BlogError> {
    match errors {
        Some(errors) => Err(BlogError::Remote {
            resource: resource.to_string(),
            errors,
        }),
        None => Ok(()),
    }
}
