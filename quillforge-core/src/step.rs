//! ABOUTME: Step records — one per agent invocation, append-only per job (§3 Step)

use crate::agent_type::AgentType;
use crate::ids::{JobId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Persistent record of one agent invocation (§3 Step, §6.2 `job_steps`).
///
/// `(job_id, agent_type, iteration)` uniquely identifies a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub job_id: JobId,
    pub agent_type: AgentType,
    pub iteration: u32,
    pub status: StepStatus,
    pub tokens_used: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub duration_ms: Option<u64>,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub logs: Vec<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    #[must_use]
    pub fn new(job_id: JobId, agent_type: AgentType, iteration: u32) -> Self {
        Self {
            id: StepId::new(),
            job_id,
            agent_type,
            iteration,
            status: StepStatus::Running,
            tokens_used: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            duration_ms: None,
            input: None,
            output: None,
            logs: Vec::new(),
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, output: serde_json::Value, tokens: (u32, u32)) {
        let now = Utc::now();
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.prompt_tokens = tokens.0;
        self.completion_tokens = tokens.1;
        self.tokens_used = tokens.0 + tokens.1;
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error_message: impl Into<String>) {
        let now = Utc::now();
        self.status = StepStatus::Failed;
        self.error_message = Some(error_message.into());
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_completion_sets_timing_and_tokens_invariant() {
        let mut step = Step::new(JobId::new(), AgentType::Writer, 1);
        step.complete(serde_json::json!({"ok": true}), (100, 200));
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.tokens_used, 300);
        assert!(step.completed_at.unwrap() >= step.started_at);
    }

    #[test]
    fn step_failure_records_message() {
        let mut step = Step::new(JobId::new(), AgentType::Qa, 1);
        step.fail("boom");
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.error_message.as_deref(), Some("boom"));
    }
}
