//! ABOUTME: Job control endpoints (§6.1) — thin handlers over the `Repository` seam

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use quillforge_core::ids::JobId;
use quillforge_core::job::{Job, JobSettings, JobStatus};
use quillforge_core::traits::repository::{JobListPage, JobListQuery, JobOrderBy, OrderDirection};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub keyword: String,
    #[serde(default)]
    pub settings: Option<JobSettings>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "api".to_string()
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<Job>, ApiError> {
    let settings = request.settings.unwrap_or_else(|| JobSettings {
        max_iterations: state.default_max_iterations,
        ..JobSettings::default()
    });
    settings.validate()?;
    let job = state
        .repository
        .create_job(request.keyword, settings, request.priority, request.created_by)
        .await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListPage>, ApiError> {
    let page = state
        .repository
        .list_jobs(JobListQuery {
            status: query.status,
            limit: query.limit.min(100),
            offset: query.offset,
            order_by: JobOrderBy::CreatedAt,
            order_direction: OrderDirection::Descending,
        })
        .await?;
    Ok(Json(page))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    let job = state
        .repository
        .get_job(id)
        .await?
        .ok_or_else(|| quillforge_core::error::PipelineError::not_found(format!("job {id} not found")))?;
    Ok(Json(job))
}

pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    let job = state.repository.cancel_job(id, "api".to_string()).await?;
    Ok(Json(job))
}

pub async fn retry_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Json<Job>, ApiError> {
    let job = state.repository.retry_job(id).await?;
    Ok(Json(job))
}

pub async fn job_logs(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<Vec<quillforge_core::traits::repository::SystemLogRow>>, ApiError> {
    let logs = state.repository.recent_logs(id, 100).await?;
    Ok(Json(logs))
}
