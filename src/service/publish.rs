//! Broadcasting a score as a post or a comment

use tracing::{info, warn};

use crate::http::error::ApiError;
use crate::social::{CommentRef, PostRef, SharedPoster};
use crate::store::{comment_rate_key, publish_rate_key, SharedStore};
use crate::util::time::SharedClock;

use super::input::ANONYMOUS;

/// Cooldown per identity and action
pub const PUBLISH_COOLDOWN_MS: i64 = 10_000;

pub fn post_title(username: &str, score: u32) -> String {
    format!("u/{} scored {} in Whirlbird on Steroids!", username, score)
}

pub fn comment_text(score: u32) -> String {
    format!(
        "I just scored **{}** in Whirlbird on Steroids! Can you beat my score?",
        score
    )
}

/// Publishing needs a real identity; `action` names the refused verb
pub fn require_login(username: &str, action: &str) -> Result<(), ApiError> {
    if username == ANONYMOUS {
        return Err(ApiError::Auth(format!("login required to {}", action)));
    }
    Ok(())
}

/// Fullname of the game post, whether or not the id already carries the kind
pub fn post_fullname(post_id: &str) -> String {
    format!("t3_{}", post_id.strip_prefix("t3_").unwrap_or(post_id))
}

#[derive(Clone)]
pub struct PublishService {
    store: SharedStore,
    clock: SharedClock,
    poster: SharedPoster,
}

impl PublishService {
    pub fn new(store: SharedStore, clock: SharedClock, poster: SharedPoster) -> Self {
        Self {
            store,
            clock,
            poster,
        }
    }

    /// Create a new post announcing the score
    pub async fn publish(&self, username: &str, score: u32) -> Result<PostRef, ApiError> {
        require_login(username, "publish")?;
        self.claim(&publish_rate_key(username), "please wait before publishing again")
            .await?;

        let post = self
            .poster
            .submit_custom_post(&post_title(username, score))
            .await
            .map_err(|e| {
                warn!(username, "Publish failed");
                ApiError::from(e)
            })?;

        info!(username, score, post_id = %post.id, "Score published");
        Ok(post)
    }

    /// Reply under the game post with the score
    pub async fn comment(
        &self,
        username: &str,
        post_id: &str,
        score: u32,
    ) -> Result<CommentRef, ApiError> {
        require_login(username, "comment")?;
        self.claim(&comment_rate_key(username), "please wait before commenting again")
            .await?;

        let comment = self
            .poster
            .submit_comment(&post_fullname(post_id), &comment_text(score))
            .await
            .map_err(|e| {
                warn!(username, "Comment failed");
                ApiError::from(e)
            })?;

        info!(username, score, comment_id = %comment.id, "Score commented");
        Ok(comment)
    }

    async fn claim(&self, key: &str, message: &str) -> Result<(), ApiError> {
        let now = self.clock.now_millis();
        if self.store.claim_window(key, now, PUBLISH_COOLDOWN_MS).await? {
            Ok(())
        } else {
            Err(ApiError::RateLimited(message.to_string()))
        }
    }
}
