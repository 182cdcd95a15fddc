//! Request middleware: identity tokens, request context, body guard, throttle

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::app::AppState;
use crate::game::reporter::POST_ID_HEADER;
use crate::http::error::ApiError;
use crate::service::input::{sanitize_username, ANONYMOUS};

type HmacSha256 = Hmac<Sha256>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 256;

/// Identity token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Display name, used when `username` is absent
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
}

impl IdentityClaims {
    pub fn display_username(&self) -> Option<&str> {
        self.username.as_deref().or(self.name.as_deref())
    }
}

/// Verify an HS256 token and extract its claims
pub fn verify_jwt(token: &str, secret: &str, now_secs: u64) -> Result<IdentityClaims, IdentityError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(IdentityError::InvalidToken);
    }

    let header_b64 = parts[0];
    let payload_b64 = parts[1];
    let signature_b64 = parts[2];

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| IdentityError::InvalidToken)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| IdentityError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&provided_signature)
        .map_err(|_| IdentityError::InvalidToken)?;

    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| IdentityError::InvalidToken)?;

    let claims: IdentityClaims =
        serde_json::from_slice(&payload_json).map_err(|_| IdentityError::InvalidToken)?;

    if claims.exp < now_secs {
        return Err(IdentityError::TokenExpired);
    }

    Ok(claims)
}

/// Username carried by the request's bearer token, if any valid one is present.
/// Every failure is treated as "no identity".
pub fn current_username(headers: &HeaderMap, secret: &str, now_secs: u64) -> Option<String> {
    let Authorization(bearer) = headers.typed_get::<Authorization<Bearer>>()?;
    match verify_jwt(bearer.token(), secret, now_secs) {
        Ok(claims) => claims.display_username().map(str::to_string),
        Err(e) => {
            debug!(error = %e, "Ignoring identity token");
            None
        }
    }
}

/// Identity token errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,
}

/// Per-request context resolved before any handler runs
#[derive(Debug, Clone)]
pub struct RequestContext {
    post_id: Option<String>,
    /// Sanitized username, or the anonymous placeholder
    pub username: String,
}

impl RequestContext {
    pub fn new(post_id: Option<String>, username: String) -> Self {
        Self { post_id, username }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS
    }

    pub fn has_post_id(&self) -> bool {
        self.post_id.is_some()
    }

    /// The game post id, required by every API endpoint
    pub fn post_id(&self) -> Result<&str, ApiError> {
        self.post_id
            .as_deref()
            .ok_or_else(|| ApiError::Validation("postId missing".to_string()))
    }
}

/// Resolve post id and identity into a [`RequestContext`] extension
pub async fn resolve_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let post_id = request
        .headers()
        .get(POST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let now_secs = (state.clock.now_millis() / 1000).max(0) as u64;
    let raw = current_username(request.headers(), &state.config.identity_secret, now_secs);
    let username = sanitize_username(raw.as_deref());

    request
        .extensions_mut()
        .insert(RequestContext::new(post_id, username));

    next.run(request).await
}

/// Burst throttle keyed by identity, or by peer address for anonymous callers
pub async fn throttle_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = request.extensions().get::<RequestContext>();
    // without a post id the handler rejects with 400, which must not cost a token
    if ctx.map_or(true, |ctx| !ctx.has_post_id()) {
        return next.run(request).await;
    }

    let key = match ctx {
        Some(ctx) if !ctx.is_anonymous() => format!("user:{}", ctx.username),
        _ => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
            .unwrap_or_else(|| format!("user:{}", ANONYMOUS)),
    };

    if !state.throttle.check(&key) {
        debug!(key = %key, "Request throttled");
        return ApiError::RateLimited("too many requests".to_string()).into_response();
    }

    next.run(request).await
}

/// JSON content type and body size guard for POST/PUT/PATCH
pub async fn json_guard(request: Request, next: Next) -> Result<Response, ApiError> {
    if !matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH) {
        return Ok(next.run(request).await);
    }

    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(ApiError::UnsupportedMediaType);
    }

    let declared_len = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > MAX_BODY_BYTES) {
        return Err(ApiError::PayloadTooLarge);
    }

    // Chunked bodies carry no length; cap what is actually read
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn sign(payload: serde_json::Value, secret: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", header, payload).as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}.{}", header, payload, signature)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn valid_token_yields_username() {
        let token = sign(serde_json::json!({"username": "ann", "exp": 2_000}), SECRET);
        let claims = verify_jwt(&token, SECRET, 1_000).unwrap();
        assert_eq!(claims.display_username(), Some("ann"));
        assert_eq!(current_username(&bearer(&token), SECRET, 1_000).as_deref(), Some("ann"));
    }

    #[test]
    fn name_claim_is_the_fallback() {
        let token = sign(serde_json::json!({"name": "bob", "exp": 2_000}), SECRET);
        assert_eq!(current_username(&bearer(&token), SECRET, 1_000).as_deref(), Some("bob"));
    }

    #[test]
    fn bad_tokens_fail_soft() {
        let wrong_key = sign(serde_json::json!({"username": "ann", "exp": 2_000}), "other");
        assert!(matches!(
            verify_jwt(&wrong_key, SECRET, 1_000),
            Err(IdentityError::InvalidToken)
        ));
        assert_eq!(current_username(&bearer(&wrong_key), SECRET, 1_000), None);

        let expired = sign(serde_json::json!({"username": "ann", "exp": 10}), SECRET);
        assert!(matches!(
            verify_jwt(&expired, SECRET, 1_000),
            Err(IdentityError::TokenExpired)
        ));
        assert_eq!(current_username(&bearer(&expired), SECRET, 1_000), None);

        assert_eq!(current_username(&bearer("not.a.token"), SECRET, 1_000), None);
        assert_eq!(current_username(&HeaderMap::new(), SECRET, 1_000), None);
    }

    #[test]
    fn context_requires_post_id() {
        let ctx = RequestContext::new(None, ANONYMOUS.to_string());
        assert!(ctx.is_anonymous());
        assert!(!ctx.has_post_id());
        assert!(matches!(ctx.post_id(), Err(ApiError::Validation(_))));

        let ctx = RequestContext::new(Some("abc".into()), "ann".into());
        assert!(ctx.has_post_id());
        assert_eq!(ctx.post_id().unwrap(), "abc");
        assert!(!ctx.is_anonymous());
    }
}
