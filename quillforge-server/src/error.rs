//! ABOUTME: Maps `PipelineError` onto HTTP status codes and a uniform JSON error body
//! ABOUTME: (§6.1 "Exit/HTTP codes reflect the failure taxonomy")

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quillforge_core::error::PipelineError;
use serde_json::json;

pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
            PipelineError::IllegalTransition { .. } => StatusCode::BAD_REQUEST,
            PipelineError::Auth { .. } => StatusCode::UNAUTHORIZED,
            PipelineError::NotFound { .. } | PipelineError::AgentNotFound(_) | PipelineError::PersonaNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::Cancelled => StatusCode::CONFLICT,
            PipelineError::UpstreamTransient { .. }
            | PipelineError::UpstreamPermanent { .. }
            | PipelineError::Truncation { .. }
            | PipelineError::Provider { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::Storage { .. } | PipelineError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError(PipelineError::not_found("job missing")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let response = ApiError(PipelineError::validation("bad keyword")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cancelled_maps_to_409() {
        let response = ApiError(PipelineError::Cancelled).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
