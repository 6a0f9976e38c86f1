//! ABOUTME: Drives the full router with `tower::ServiceExt::oneshot`, no real listener

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use quillforge_core::job::JobStatus;
use quillforge_orchestrator::Metrics;
use quillforge_server::state::AppState;
use quillforge_testing::MockRepository;
use std::sync::Arc;
use tower::ServiceExt;

fn build_state() -> (AppState, Arc<MockRepository>) {
    let repository = Arc::new(MockRepository::new());
    let state = AppState::new(
        Arc::clone(&repository) as Arc<dyn quillforge_core::traits::repository::Repository>,
        Arc::new(Metrics::new()),
        None,
        5,
    );
    (state, repository)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn creating_a_job_returns_it_pending() {
    let (state, _repository) = build_state();
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"keyword": "best running shoes"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["keyword"], "best running shoes");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn getting_an_unknown_job_is_a_404() {
    let (state, _repository) = build_state();
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_a_pending_job_transitions_it_immediately() {
    let (state, repository) = build_state();
    let job = repository
        .create_job(
            "trail shoes".into(),
            quillforge_testing::sample_job_settings(),
            0,
            "tester".into(),
        )
        .await
        .unwrap();
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/jobs/{}/cancel", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn retrying_a_non_failed_job_is_rejected() {
    let (state, repository) = build_state();
    let job = repository
        .create_job(
            "trail shoes".into(),
            quillforge_testing::sample_job_settings(),
            0,
            "tester".into(),
        )
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/jobs/{}/retry", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_key_mismatch_is_rejected_when_configured() {
    let repository = Arc::new(MockRepository::new());
    let state = AppState::new(
        repository as Arc<dyn quillforge_core::traits::repository::Repository>,
        Arc::new(Metrics::new()),
        Some("secret".to_string()),
        5,
    );
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_requires_no_admin_key() {
    let repository = Arc::new(MockRepository::new());
    let state = AppState::new(
        repository as Arc<dyn quillforge_core::traits::repository::Repository>,
        Arc::new(Metrics::new()),
        Some("secret".to_string()),
        5,
    );
    let app = quillforge_server::build_app(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
