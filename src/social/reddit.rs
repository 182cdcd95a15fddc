//! Reddit OAuth API client

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;

use super::{CommentRef, PostRef, SocialError, SocialPoster};

const USER_AGENT: &str = concat!("whirlbird_server/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_API_URL: &str = "https://oauth.reddit.com";

/// Posts into one subreddit with a pre-issued bearer token
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    api_url: String,
    access_token: String,
    subreddit: String,
}

impl RedditClient {
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        subreddit: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            subreddit: subreddit.into(),
        }
    }

    /// Build from config; `None` when no social credentials are configured
    pub fn from_config(config: &Config) -> Option<Self> {
        match (&config.social_access_token, &config.subreddit) {
            (Some(token), Some(subreddit)) => Some(Self::new(
                config.social_api_url.clone(),
                token.clone(),
                subreddit.clone(),
            )),
            _ => None,
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, SocialError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SocialError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonEnvelope<T> = response.json().await?;
        envelope.json.into_result()
    }
}

/// `api_type=json` replies wrap everything in `{"json": {...}}`
#[derive(Debug, Deserialize)]
struct JsonEnvelope<T> {
    json: JsonBody<T>,
}

#[derive(Debug, Deserialize)]
struct JsonBody<T> {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<T>,
}

impl<T> JsonBody<T> {
    fn into_result(self) -> Result<T, SocialError> {
        if let Some(first) = self.errors.first() {
            // [code, message, field]
            let message = first
                .get(1)
                .and_then(|m| m.as_str())
                .or_else(|| first.first().and_then(|c| c.as_str()))
                .unwrap_or("request rejected");
            return Err(SocialError::Rejected(message.to_string()));
        }
        self.data.ok_or(SocialError::MissingData("data"))
    }
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    name: Option<String>,
    id: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    things: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    name: Option<String>,
    id: Option<String>,
}

fn post_ref(data: SubmitData) -> Result<PostRef, SocialError> {
    let id = data
        .name
        .or_else(|| data.id.map(|id| format!("t3_{}", id)))
        .ok_or(SocialError::MissingData("post id"))?;
    let url = data.url.ok_or(SocialError::MissingData("post url"))?;
    Ok(PostRef { id, url })
}

fn comment_ref(data: CommentData) -> Result<CommentRef, SocialError> {
    let thing = data
        .things
        .into_iter()
        .next()
        .ok_or(SocialError::MissingData("comment"))?;
    let id = thing
        .data
        .name
        .or_else(|| thing.data.id.map(|id| format!("t1_{}", id)))
        .ok_or(SocialError::MissingData("comment id"))?;
    Ok(CommentRef { id })
}

impl SocialPoster for RedditClient {
    fn submit_custom_post<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<PostRef, SocialError>> {
        async move {
            let data: SubmitData = self
                .post_form(
                    "/api/submit",
                    &[
                        ("sr", self.subreddit.as_str()),
                        ("kind", "self"),
                        ("title", title),
                        ("text", ""),
                        ("api_type", "json"),
                    ],
                )
                .await?;
            let post = post_ref(data)?;
            debug!(post_id = %post.id, subreddit = %self.subreddit, "Post submitted");
            Ok(post)
        }
        .boxed()
    }

    fn submit_comment<'a>(
        &'a self,
        thing_id: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, Result<CommentRef, SocialError>> {
        async move {
            let data: CommentData = self
                .post_form(
                    "/api/comment",
                    &[("thing_id", thing_id), ("text", text), ("api_type", "json")],
                )
                .await?;
            let comment = comment_ref(data)?;
            debug!(comment_id = %comment.id, parent = thing_id, "Comment submitted");
            Ok(comment)
        }
        .boxed()
    }
}
