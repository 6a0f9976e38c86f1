//! ABOUTME: The supervised job-queue worker (§4.7) — polls for pending jobs,
//! ABOUTME: runs a bounded number of them concurrently, and recovers stuck jobs on startup

use crate::pipeline::Orchestrator;
use quillforge_core::error::Result;
use quillforge_core::job::{Job, JobStatus};
use quillforge_core::traits::repository::{JobListQuery, Repository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often the worker polls for a claimable job (§4.7 "tick ~1s").
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What `recover_stuck_jobs` does with a job left in `processing` past its
/// timeout (§4.7 "reset to pending (or failed, configurable)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashRecoveryAction {
    ResetToPending,
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub max_concurrent_jobs: usize,
    pub job_timeout_minutes: i64,
    pub crash_recovery_action: CrashRecoveryAction,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            job_timeout_minutes: 30,
            crash_recovery_action: CrashRecoveryAction::Fail,
        }
    }
}

pub struct Worker {
    orchestrator: Arc<Orchestrator>,
    repository: Arc<dyn Repository>,
    settings: WorkerSettings,
    shutdown: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl Worker {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, repository: Arc<dyn Repository>, settings: WorkerSettings) -> Self {
        Self {
            orchestrator,
            repository,
            settings,
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Reconciles jobs left in `processing` by a presumably crashed previous
    /// run of the worker (§4.7 "On startup, reconcile stuck jobs").
    pub async fn recover_stuck_jobs(&self) -> Result<usize> {
        let page = self
            .repository
            .list_jobs(JobListQuery {
                status: Some(JobStatus::Processing),
                limit: 1000,
                ..Default::default()
            })
            .await?;

        let cutoff = chrono::Utc::now() - chrono::Duration::minutes(self.settings.job_timeout_minutes);
        let mut recovered = 0;
        for job in page.jobs {
            if job.updated_at < cutoff {
                warn!(job_id = %job.id, "recovering stuck job left processing by a previous run");
                self.reconcile_stuck(&job).await;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    async fn reconcile_stuck(&self, job: &Job) {
        use quillforge_core::traits::repository::JobPatch;
        let patch = match self.settings.crash_recovery_action {
            CrashRecoveryAction::Fail => JobPatch {
                status: Some(JobStatus::Failed),
                last_error: Some(Some("job timed out while processing (worker restarted)".to_string())),
                ..Default::default()
            },
            CrashRecoveryAction::ResetToPending => JobPatch {
                status: Some(JobStatus::Pending),
                current_agent: Some(None),
                ..Default::default()
            },
        };
        let _ = self.repository.update_job(job.id, patch).await;
    }

    /// Runs until `shutdown_handle().cancel()` is called, claiming and running
    /// jobs with at most `max_concurrent_jobs` in flight at once (§4.7).
    pub async fn run(&self) {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_jobs));
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut ticker = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("worker shutting down, draining in-flight jobs");
                    break;
                }
                _ = ticker.tick() => {
                    self.claim_and_spawn(&semaphore, &mut tasks).await;
                }
                Some(_finished) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}
    }

    async fn claim_and_spawn(&self, semaphore: &Arc<Semaphore>, tasks: &mut JoinSet<()>) {
        let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
            return;
        };

        let claimed = self.repository.claim_next().await;
        match claimed {
            Ok(Some(job)) => {
                let orchestrator = Arc::clone(&self.orchestrator);
                let in_flight = Arc::clone(&self.in_flight);
                in_flight.fetch_add(1, Ordering::Relaxed);
                tasks.spawn(async move {
                    let _permit = permit;
                    let job_id = job.id;
                    let result = orchestrator.run_job(job).await;
                    if !result.success && !result.cancelled {
                        warn!(%job_id, error = ?result.error, "job finished with failure");
                    }
                    in_flight.fetch_sub(1, Ordering::Relaxed);
                });
            }
            Ok(None) => {
                drop(permit);
            }
            Err(err) => {
                warn!(%err, "failed to claim next job");
                drop(permit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn worker_is_send_and_sync() {
        assert_send_sync::<Worker>();
    }

    #[test]
    fn default_settings_match_the_documented_defaults() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.max_concurrent_jobs, 5);
        assert_eq!(settings.job_timeout_minutes, 30);
        assert_eq!(settings.crash_recovery_action, CrashRecoveryAction::Fail);
    }

    #[test]
    fn poll_interval_is_sub_minute() {
        assert!(POLL_INTERVAL < Duration::from_secs(60));
    }
}
