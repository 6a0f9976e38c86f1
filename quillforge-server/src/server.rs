//! ABOUTME: Router assembly (cf. `llmspell-web`'s `WebServer::build_app`) — one function so
//! ABOUTME: integration tests can exercise the full stack with `tower::ServiceExt::oneshot`

use crate::auth::require_admin_key;
use crate::routes::{jobs, stream};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "metrics": state.metrics.snapshot()}))
}

#[must_use]
pub fn build_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/jobs/:id/retry", post(jobs::retry_job))
        .route("/jobs/:id/logs", get(jobs::job_logs))
        .route("/jobs/:id/stream", get(stream::job_stream))
        .route("/jobs/stream", get(stream::jobs_stream))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_key));

    Router::new()
        .route("/health", get(health))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
