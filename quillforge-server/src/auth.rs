//! ABOUTME: Admin API key check (§6.1 "All admin endpoints require admin auth")
//! ABOUTME: Header name follows the `X-API-Key` convention exercised in the web-layer test suite

use crate::state::AppState;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// No-op when `admin_api_key` is unset (local/dev deployments), so the binary
/// runs out of the box without a key configured.
pub async fn require_admin_key<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_api_key.as_deref() else {
        return Ok(next.run(request).await);
    };
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
