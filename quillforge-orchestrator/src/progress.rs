//! ABOUTME: Progress accounting (§4.6) and the stream change-detection state
//! ABOUTME: machines (§4.8) that the SSE transport layer polls through

use quillforge_core::ids::JobId;
use quillforge_core::job::{Job, JobStatus};
use std::collections::{HashMap, HashSet};

/// Progress is capped at 95 until Project Manager completes, so clients never
/// see "100%, still running" (§4.6 "Progress accounting").
pub const PROGRESS_CAP_BEFORE_PM: u8 = 95;

/// `floor(completed_weight / 100 * 100)` collapses to `completed_weight` itself
/// since the five agent weights already sum to 100 (`AgentType::progress_weight`).
#[must_use]
pub const fn compute_progress(completed_weight: u8, pm_completed: bool) -> u8 {
    if pm_completed {
        100
    } else if completed_weight > PROGRESS_CAP_BEFORE_PM {
        PROGRESS_CAP_BEFORE_PM
    } else {
        completed_weight
    }
}

/// One event emitted by a per-job progress poller (§4.8 "Per-job").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Progress { progress_percent: u8, status: JobStatus },
    Terminal { status: JobStatus },
}

/// Tracks a single client's last-seen state for one job so repeated polls of
/// an unchanged job emit nothing, and the terminal event fires exactly once.
#[derive(Default)]
pub struct PerJobTracker {
    last_progress: Option<u8>,
    terminal_emitted: bool,
}

impl PerJobTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_event(&mut self, job: &Job) -> Option<StreamEvent> {
        if self.terminal_emitted {
            return None;
        }
        if job.status.is_terminal() {
            self.terminal_emitted = true;
            return Some(StreamEvent::Terminal { status: job.status });
        }
        if self.last_progress == Some(job.progress_percent) {
            return None;
        }
        self.last_progress = Some(job.progress_percent);
        Some(StreamEvent::Progress {
            progress_percent: job.progress_percent,
            status: job.status,
        })
    }
}

/// Snapshot of one job tracked by the global-active stream (§4.8 "Global-active").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveJobView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_percent: u8,
}

impl ActiveJobView {
    #[must_use]
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress_percent: job.progress_percent,
        }
    }
}

pub struct ActiveJobsDiff {
    pub changed: bool,
    pub active: Vec<ActiveJobView>,
    pub removed_job_ids: Vec<JobId>,
}

/// Maintains the `(jobId -> view)` map across ticks for one client connection
/// (§4.8 "Pollers never share state between clients").
#[derive(Default)]
pub struct ActiveJobsTracker {
    previous: HashMap<JobId, ActiveJobView>,
}

impl ActiveJobsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, current_active: Vec<ActiveJobView>) -> ActiveJobsDiff {
        let current_ids: HashSet<JobId> = current_active.iter().map(|v| v.job_id).collect();
        let removed_job_ids: Vec<JobId> =
            self.previous.keys().filter(|id| !current_ids.contains(id)).copied().collect();

        let mut changed = !removed_job_ids.is_empty();
        for view in &current_active {
            match self.previous.get(&view.job_id) {
                Some(prev) if prev == view => {}
                _ => changed = true,
            }
        }

        self.previous = current_active.iter().map(|v| (v.job_id, *v)).collect();
        ActiveJobsDiff {
            changed,
            active: current_active,
            removed_job_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillforge_core::job::JobSettings;

    fn job_with(status: JobStatus, progress: u8) -> Job {
        let mut job = Job::new("kw".into(), JobSettings::default(), 0, "tester".into());
        job.status = status;
        job.progress_percent = progress;
        job
    }

    #[test]
    fn progress_is_capped_below_pm_completion() {
        assert_eq!(compute_progress(100, false), PROGRESS_CAP_BEFORE_PM);
        assert_eq!(compute_progress(65, false), 65);
    }

    #[test]
    fn progress_reaches_100_only_when_pm_completed() {
        assert_eq!(compute_progress(80, true), 100);
    }

    #[test]
    fn per_job_tracker_emits_progress_only_on_change() {
        let mut tracker = PerJobTracker::new();
        let job = job_with(JobStatus::Processing, 15);
        assert!(tracker.next_event(&job).is_some());
        assert!(tracker.next_event(&job).is_none());
    }

    #[test]
    fn per_job_tracker_emits_terminal_exactly_once() {
        let mut tracker = PerJobTracker::new();
        let job = job_with(JobStatus::Completed, 100);
        assert!(matches!(tracker.next_event(&job), Some(StreamEvent::Terminal { .. })));
        assert!(tracker.next_event(&job).is_none());
    }

    #[test]
    fn active_tracker_detects_added_changed_and_removed_jobs() {
        let mut tracker = ActiveJobsTracker::new();
        let job_a = job_with(JobStatus::Processing, 10);
        let first = tracker.diff(vec![ActiveJobView::from_job(&job_a)]);
        assert!(first.changed);

        let unchanged = tracker.diff(vec![ActiveJobView::from_job(&job_a)]);
        assert!(!unchanged.changed);

        let removed = tracker.diff(vec![]);
        assert!(removed.changed);
        assert_eq!(removed.removed_job_ids, vec![job_a.id]);
    }
}
