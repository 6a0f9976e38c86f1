//! ABOUTME: In-process counters (SPEC_FULL §2 "Metrics/observability surface")
//! ABOUTME: Logged periodically by the worker; no exporter, mirrors the teacher's counter-struct shape

use dashmap::DashMap;
use quillforge_core::agent_type::AgentType;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    jobs_started: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_cancelled: AtomicU64,
    agent_tokens: DashMap<AgentType, AtomicU64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub agent_tokens: Vec<(AgentType, u64)>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_job_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_cancelled(&self) {
        self.jobs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_agent_tokens(&self, agent_type: AgentType, tokens: u32) {
        self.agent_tokens
            .entry(agent_type)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(u64::from(tokens), Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
            agent_tokens: self
                .agent_tokens
                .iter()
                .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }

    pub fn log_snapshot(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            jobs_started = snapshot.jobs_started,
            jobs_completed = snapshot.jobs_completed,
            jobs_failed = snapshot.jobs_failed,
            jobs_cancelled = snapshot.jobs_cancelled,
            "pipeline metrics snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_started, 0);
    }

    #[test]
    fn recording_increments_the_right_counter() {
        let metrics = Metrics::new();
        metrics.record_job_started();
        metrics.record_job_completed();
        metrics.record_job_completed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_started, 1);
        assert_eq!(snapshot.jobs_completed, 2);
    }

    #[test]
    fn agent_token_totals_accumulate_per_type() {
        let metrics = Metrics::new();
        metrics.record_agent_tokens(AgentType::Writer, 100);
        metrics.record_agent_tokens(AgentType::Writer, 50);
        metrics.record_agent_tokens(AgentType::Qa, 10);
        let snapshot = metrics.snapshot();
        let writer_tokens = snapshot.agent_tokens.iter().find(|(t, _)| *t == AgentType::Writer).unwrap().1;
        assert_eq!(writer_tokens, 150);
    }
}
