//! ABOUTME: SSE progress endpoints (§4.8, §6.1) — per-job and global-active pollers
//! ABOUTME: Each connection owns its own tracker; pollers never share state across clients

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use quillforge_core::ids::JobId;
use quillforge_core::job::JobStatus;
use quillforge_core::traits::repository::{JobListQuery, Repository};
use quillforge_orchestrator::{ActiveJobsTracker, ActiveJobView, PerJobTracker, StreamEvent};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// How often the global-active stream re-polls the repository (§4.8).
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How often the per-job stream re-polls the repository (§4.8).
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn status_event_name(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "complete",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
        JobStatus::Pending | JobStatus::Processing => "progress",
    }
}

fn per_job_event(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Progress { progress_percent, status } => Event::default()
            .event("progress")
            .data(json!({"progressPercent": progress_percent, "status": status}).to_string()),
        StreamEvent::Terminal { status } => Event::default()
            .event(status_event_name(status))
            .data(json!({"status": status}).to_string()),
    }
}

pub async fn job_stream(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let repository = Arc::clone(&state.repository);
    let stream = futures::stream::unfold(
        (repository, PerJobTracker::new(), false),
        move |(repository, mut tracker, done)| async move {
            if done {
                return None;
            }
            loop {
                tokio::time::sleep(JOB_POLL_INTERVAL).await;
                let job = match repository.get_job(id).await {
                    Ok(Some(job)) => job,
                    Ok(None) => {
                        let event = Event::default().event("error").data("job not found");
                        return Some((Ok(event), (repository, tracker, true)));
                    }
                    Err(e) => {
                        let event = Event::default().event("error").data(e.to_string());
                        return Some((Ok(event), (repository, tracker, true)));
                    }
                };
                if let Some(stream_event) = tracker.next_event(&job) {
                    let terminal = matches!(stream_event, StreamEvent::Terminal { .. });
                    let event = per_job_event(stream_event);
                    return Some((Ok(event), (repository, tracker, terminal)));
                }
            }
        },
    );
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(10)))
}

/// "Active" is pending-or-processing (§4.8: `list(status=pending) ∪ list(status=processing)`).
async fn fetch_active_jobs(repository: &dyn Repository) -> quillforge_core::error::Result<Vec<ActiveJobView>> {
    let mut active = Vec::new();
    for status in [JobStatus::Pending, JobStatus::Processing] {
        let page = repository
            .list_jobs(JobListQuery {
                status: Some(status),
                limit: 1000,
                ..Default::default()
            })
            .await?;
        active.extend(page.jobs.iter().map(ActiveJobView::from_job));
    }
    Ok(active)
}

pub async fn jobs_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let repository = Arc::clone(&state.repository);
    let stream = futures::stream::unfold(
        (repository, ActiveJobsTracker::new()),
        move |(repository, mut tracker)| async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                let active = match fetch_active_jobs(repository.as_ref()).await {
                    Ok(active) => active,
                    Err(e) => {
                        let event = Event::default().event("error").data(e.to_string());
                        return Some((Ok(event), (repository, tracker)));
                    }
                };
                let diff = tracker.diff(active);
                if diff.changed {
                    let payload = json!({
                        "active": diff.active.iter().map(|v| json!({
                            "jobId": v.job_id,
                            "status": v.status,
                            "progressPercent": v.progress_percent,
                        })).collect::<Vec<_>>(),
                        "removedJobIds": diff.removed_job_ids,
                    });
                    let event = Event::default().event("jobs").data(payload.to_string());
                    return Some((Ok(event), (repository, tracker)));
                }
            }
        },
    );
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(10)))
}
