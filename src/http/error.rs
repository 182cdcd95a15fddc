//! API error type and its JSON envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::http::protocol::ErrorBody;
use crate::social::SocialError;
use crate::store::StoreError;

/// Every failure a handler can report to the client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Auth(String),

    #[error("not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        // Detail stays in the logs
        error!(error = %e, "Store failure");
        ApiError::Internal("storage unavailable".to_string())
    }
}

impl From<SocialError> for ApiError {
    fn from(e: SocialError) -> Self {
        error!(error = %e, "Social API failure");
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
