//! Social platform posting (score posts and comments)

pub mod reddit;

use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub use reddit::RedditClient;

/// A created post
#[derive(Debug, Clone, PartialEq)]
pub struct PostRef {
    pub id: String,
    pub url: String,
}

/// A created comment
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRef {
    pub id: String,
}

/// Creates posts and comments on behalf of the app
pub trait SocialPoster: Send + Sync {
    fn submit_custom_post<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<PostRef, SocialError>>;

    /// Reply to the thing identified by its fullname (e.g. `t3_abc`)
    fn submit_comment<'a>(
        &'a self,
        thing_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<CommentRef, SocialError>>;
}

pub type SharedPoster = Arc<dyn SocialPoster>;

/// Development poster that only logs and mints ids
#[derive(Debug, Clone)]
pub struct LoggingPoster {
    base_url: String,
}

impl LoggingPoster {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn short_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

impl Default for LoggingPoster {
    fn default() -> Self {
        Self::new("http://localhost")
    }
}

impl SocialPoster for LoggingPoster {
    fn submit_custom_post<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<PostRef, SocialError>> {
        let id = format!("t3_{}", Self::short_id());
        let url = format!("{}/comments/{}", self.base_url, &id[3..]);
        info!(post_id = %id, title, "Custom post (not sent)");
        future::ready(Ok(PostRef { id, url })).boxed()
    }

    fn submit_comment<'a>(
        &'a self,
        thing_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<CommentRef, SocialError>> {
        let id = format!("t1_{}", Self::short_id());
        info!(comment_id = %id, parent = thing_id, text, "Comment (not sent)");
        future::ready(Ok(CommentRef { id })).boxed()
    }
}

/// Social API errors
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Social API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("{0}")]
    Rejected(String),

    #[error("No {0} returned")]
    MissingData(&'static str),
}
