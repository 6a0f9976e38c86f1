//! ABOUTME: Job state machine, pipeline execution algorithm, and the bounded-concurrency worker loop
//! ABOUTME: Everything downstream (the HTTP API, the binary entrypoint) depends on this crate, not storage directly

pub mod compensation;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod worker;

pub use compensation::{CompensationHook, NoopCompensationHook};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::{JobRunResult, Orchestrator};
pub use progress::{
    compute_progress, ActiveJobView, ActiveJobsDiff, ActiveJobsTracker, PerJobTracker, StreamEvent,
    PROGRESS_CAP_BEFORE_PM,
};
pub use worker::{CrashRecoveryAction, Worker, WorkerSettings};
