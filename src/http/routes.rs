//! HTTP route definitions

use std::any::Any;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::app::AppState;
use crate::game::reporter::POST_ID_HEADER;
use crate::http::error::ApiError;
use crate::http::middleware::{json_guard, resolve_context, throttle_requests, RequestContext};
use crate::http::protocol::{ApiResponse, HealthResponse};
use crate::service::input::parse_score;
use crate::service::publish::require_login;
use crate::util::time::uptime_secs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(POST_ID_HEADER),
        ])
        .allow_credentials(true);

    let api_routes = Router::new()
        .route("/init", get(init_handler).fallback(not_found))
        .route("/score", post(score_handler).fallback(not_found))
        .route("/leaderboard", get(leaderboard_handler).fallback(not_found))
        .route("/publish", post(publish_handler).fallback(not_found))
        .route("/comment", post(comment_handler).fallback(not_found))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(json_guard))
                .layer(middleware::from_fn_with_state(state.clone(), resolve_context))
                .layer(middleware::from_fn_with_state(state.clone(), throttle_requests)),
        );

    let router = Router::new()
        .route("/health", get(health_handler).fallback(not_found))
        .nest("/api", api_routes)
        .fallback(not_found);

    with_response_layers(router, REQUEST_TIMEOUT)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Panic and timeout handling wrapped in the security headers, so every
/// response, including a failure envelope, carries them
fn with_response_layers<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(envelope_timeout))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// The timeout layer answers with a bare 408; give it the error envelope
async fn envelope_timeout(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        warn!("Request timed out");
        return ApiError::Timeout.into_response();
    }
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Unhandled server error");
    ApiError::Internal("internal server error".to_string()).into_response()
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

// ============================================================================
// Health endpoint
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
    })
}

// ============================================================================
// Score endpoints
// ============================================================================

async fn init_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse>, ApiError> {
    let post_id = ctx.post_id()?;

    let (best_score, leaderboard) = futures::try_join!(
        state.scores.best_for(&ctx.username),
        state.scores.leaderboard()
    )?;

    Ok(Json(ApiResponse::Init {
        post_id: post_id.to_string(),
        username: ctx.username.clone(),
        best_score,
        leaderboard,
    }))
}

async fn score_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<ApiResponse>, ApiError> {
    let post_id = ctx.post_id()?;
    let score = parse_score(&body)?;

    let outcome = state.scores.submit(&ctx.username, score).await?;

    Ok(Json(ApiResponse::Score {
        post_id: post_id.to_string(),
        new_best: outcome.new_best,
        best_score: outcome.best_score,
        leaderboard: outcome.leaderboard,
    }))
}

async fn leaderboard_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ApiResponse>, ApiError> {
    let post_id = ctx.post_id()?;
    let leaderboard = state.scores.leaderboard().await?;

    Ok(Json(ApiResponse::Leaderboard {
        post_id: post_id.to_string(),
        leaderboard,
    }))
}

// ============================================================================
// Publish endpoints
// ============================================================================

async fn publish_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<ApiResponse>, ApiError> {
    ctx.post_id()?;
    // identity is checked before the body so anonymous callers always get 401
    require_login(&ctx.username, "publish")?;
    let score = parse_score(&body)?;

    let post = state.publishing.publish(&ctx.username, score).await?;

    Ok(Json(ApiResponse::Publish {
        post_id: post.id,
        post_url: post.url,
    }))
}

async fn comment_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<ApiResponse>, ApiError> {
    let post_id = ctx.post_id()?;
    require_login(&ctx.username, "comment")?;
    let score = parse_score(&body)?;

    let comment = state
        .publishing
        .comment(&ctx.username, post_id, score)
        .await?;

    Ok(Json(ApiResponse::Comment {
        comment_id: comment.id,
    }))
}
