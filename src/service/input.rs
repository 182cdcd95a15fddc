//! Request input checks shared by every score-carrying endpoint

use serde_json::Value;

use crate::http::error::ApiError;

/// Highest accepted score
pub const MAX_SCORE: u32 = 9999;
/// Placeholder identity for unauthenticated callers
pub const ANONYMOUS: &str = "anonymous";
/// Longest username kept after sanitizing
pub const MAX_USERNAME_LEN: usize = 30;

/// Parse a `{"score": n}` body. `n` must be a JSON number with an integer
/// value in `0..=MAX_SCORE`; `3.0` is accepted, `3.14` is not.
pub fn parse_score(body: &[u8]) -> Result<u32, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::Validation("invalid JSON body".to_string()))?;

    let invalid = || ApiError::Validation(format!("score must be an integer 0-{}", MAX_SCORE));
    let number = value.get("score").and_then(Value::as_f64).ok_or_else(invalid)?;

    if number.fract() != 0.0 || number < 0.0 || number > MAX_SCORE as f64 {
        return Err(invalid());
    }
    Ok(number as u32)
}

/// Keep `[A-Za-z0-9_-]`, cap at 30 characters, fall back to the placeholder
pub fn sanitize_username(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_USERNAME_LEN)
        .collect();

    if cleaned.is_empty() {
        ANONYMOUS.to_string()
    } else {
        cleaned
    }
}
