//! Redis-over-REST client (Upstash-compatible)
//!
//! Every command is a JSON array POSTed to the base URL with a bearer token.
//! The reply is `{"result": ...}` on success or `{"error": "..."}` on failure.
//! Check-and-set primitives run as Lua scripts so they stay atomic on the
//! server.

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;

use super::{ScoreStore, ScoredMember, StoreError};

/// Returns the previous value; writes only on a strictly greater value
const SET_MAX_SCRIPT: &str = r#"
local cur = tonumber(redis.call('GET', KEYS[1]) or '0') or 0
local v = tonumber(ARGV[1])
if v > cur then redis.call('SET', KEYS[1], ARGV[1]) end
return cur
"#;

/// Returns 1 and stores the timestamp when the window is free, 0 otherwise
const CLAIM_WINDOW_SCRIPT: &str = r#"
local last = tonumber(redis.call('GET', KEYS[1]))
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
if last and (now - last) < window then return 0 end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
return 1
"#;

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Store client for a Redis REST endpoint
#[derive(Clone)]
pub struct RedisRestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RedisRestClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Build from config; `None` when no store endpoint is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        match (&config.store_url, &config.store_token) {
            (Some(url), Some(token)) => Some(Self::new(url.clone(), token.clone())),
            _ => None,
        }
    }

    /// Run one command and return its raw `result`
    pub async fn command(&self, args: &[String]) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Command errors come back as 400 with an `error` field
        let reply: CommandReply = response.json().await?;
        reply_result(reply)
    }

    async fn eval(&self, script: &str, key: &str, args: &[String]) -> Result<Value, StoreError> {
        let mut command = vec![
            "EVAL".to_string(),
            script.to_string(),
            "1".to_string(),
            key.to_string(),
        ];
        command.extend_from_slice(args);
        self.command(&command).await
    }
}

fn reply_result(reply: CommandReply) -> Result<Value, StoreError> {
    if let Some(error) = reply.error {
        return Err(StoreError::Command(error));
    }
    Ok(reply.result.unwrap_or(Value::Null))
}

fn as_integer(value: &Value) -> Result<i64, StoreError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| StoreError::Reply(value.to_string())),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| StoreError::Reply(value.to_string())),
        Value::Null => Ok(0),
        _ => Err(StoreError::Reply(value.to_string())),
    }
}

fn as_score(value: &Value) -> Result<Option<f64>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| StoreError::Reply(value.to_string())),
        _ => Err(StoreError::Reply(value.to_string())),
    }
}

/// `ZRANGE ... WITHSCORES` replies with a flat member/score array
fn parse_scored_pairs(value: &Value) -> Result<Vec<ScoredMember>, StoreError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err(StoreError::Reply(value.to_string())),
    };
    if items.len() % 2 != 0 {
        return Err(StoreError::Reply(value.to_string()));
    }

    items
        .chunks(2)
        .map(|pair| {
            let member = pair[0]
                .as_str()
                .ok_or_else(|| StoreError::Reply(pair[0].to_string()))?
                .to_string();
            let score = as_score(&pair[1])?.ok_or_else(|| StoreError::Reply(pair[1].to_string()))?;
            Ok(ScoredMember { member, score })
        })
        .collect()
}

impl ScoreStore for RedisRestClient {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        async move {
            let value = self.command(&["GET".to_string(), key.to_string()]).await?;
            match value {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(s)),
                other => Ok(Some(other.to_string())),
            }
        }
        .boxed()
    }

    fn set_max<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, Result<i64, StoreError>> {
        async move {
            let previous = self.eval(SET_MAX_SCRIPT, key, &[value.to_string()]).await?;
            as_integer(&previous)
        }
        .boxed()
    }

    fn claim_window<'a>(
        &'a self,
        key: &'a str,
        now_ms: i64,
        window_ms: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let claimed = self
                .eval(
                    CLAIM_WINDOW_SCRIPT,
                    key,
                    &[now_ms.to_string(), window_ms.to_string()],
                )
                .await?;
            Ok(as_integer(&claimed)? == 1)
        }
        .boxed()
    }

    fn z_range_rev<'a>(
        &'a self,
        key: &'a str,
        start: usize,
        stop: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredMember>, StoreError>> {
        async move {
            let value = self
                .command(&[
                    "ZRANGE".to_string(),
                    key.to_string(),
                    start.to_string(),
                    stop.to_string(),
                    "REV".to_string(),
                    "WITHSCORES".to_string(),
                ])
                .await?;
            parse_scored_pairs(&value)
        }
        .boxed()
    }

    fn z_score<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
    ) -> BoxFuture<'a, Result<Option<f64>, StoreError>> {
        async move {
            let value = self
                .command(&["ZSCORE".to_string(), key.to_string(), member.to_string()])
                .await?;
            as_score(&value)
        }
        .boxed()
    }

    fn z_add_gt<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
        score: f64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            // CH makes the reply count updates as well as inserts
            let value = self
                .command(&[
                    "ZADD".to_string(),
                    key.to_string(),
                    "GT".to_string(),
                    "CH".to_string(),
                    score.to_string(),
                    member.to_string(),
                ])
                .await?;
            Ok(as_integer(&value)? > 0)
        }
        .boxed()
    }
}
