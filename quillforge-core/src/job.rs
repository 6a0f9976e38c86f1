//! ABOUTME: Job aggregate: status state machine, settings, and the job record
//! ABOUTME: Transition legality mirrors the lifecycle state machine pattern (§4.6)

use crate::agent_type::AgentType;
use crate::ids::{JobId, PersonaId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Job lifecycle status (§3, §4.6).
///
/// `pending -> processing -> {completed, failed, cancelled}`. Terminal states are
/// absorbing: no handler may transition out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether `self -> target` is a legal edge in the job state machine.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        use JobStatus::{Cancelled, Completed, Failed, Pending, Processing};
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Per-job configuration (§3 JobSettings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSettings {
    #[serde(default)]
    pub auto_post: bool,
    /// 0 means "auto" — let the Research agent recommend a word count.
    #[serde(default)]
    pub target_word_count: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_template")]
    pub template: String,
    pub parent_page_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub persona_overrides: HashMap<AgentType, PersonaId>,
    #[serde(default)]
    pub skip_agents: HashSet<AgentType>,
    pub context: Option<String>,
}

fn default_max_iterations() -> u32 {
    5
}

fn default_template() -> String {
    "article".to_string()
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            auto_post: false,
            target_word_count: 0,
            max_iterations: default_max_iterations(),
            template: default_template(),
            parent_page_id: None,
            persona_overrides: HashMap::new(),
            skip_agents: HashSet::new(),
            context: None,
        }
    }
}

impl JobSettings {
    /// Validate the closed configuration record (§3, §8 boundary case
    /// "`skipAgents` containing every agent").
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(1..=10).contains(&self.max_iterations) {
            return Err(crate::error::PipelineError::validation_field(
                "maxIterations must be in [1, 10]",
                "maxIterations",
            ));
        }
        if let Some(ctx) = &self.context {
            if ctx.chars().count() > 2000 {
                return Err(crate::error::PipelineError::validation_field(
                    "context must be at most 2000 characters",
                    "context",
                ));
            }
        }
        if self.skip_agents.len() == AgentType::ALL.len() {
            return Err(crate::error::PipelineError::validation(
                "skipAgents cannot name every agent in the pipeline",
            ));
        }
        Ok(())
    }
}

/// A content-generation job (§3 Job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub keyword: String,
    pub status: JobStatus,
    pub current_agent: Option<AgentType>,
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub total_tokens_used: u64,
    pub estimated_cost_usd: f64,
    pub progress_percent: u8,
    pub priority: i32,
    pub settings: JobSettings,
    pub final_output: Option<serde_json::Value>,
    pub page_id: Option<uuid::Uuid>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl Job {
    #[must_use]
    pub fn new(keyword: String, settings: JobSettings, priority: i32, created_by: String) -> Self {
        let now = Utc::now();
        let max_iterations = settings.max_iterations;
        Self {
            id: JobId::new(),
            keyword,
            status: JobStatus::Pending,
            current_agent: None,
            current_iteration: 1,
            max_iterations,
            total_tokens_used: 0,
            estimated_cost_usd: 0.0,
            progress_percent: 0,
            priority,
            settings,
            final_output: None,
            page_id: None,
            last_error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            created_by,
        }
    }

    /// Apply a status transition, enforcing legality (§3 invariants) and
    /// maintaining `started_at`/`completed_at`.
    pub fn transition(&mut self, target: JobStatus) -> crate::error::Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(crate::error::PipelineError::IllegalTransition {
                message: format!("cannot transition job from {} to {target}", self.status),
            });
        }
        let now = Utc::now();
        if self.started_at.is_none() && target != JobStatus::Pending {
            self.started_at = Some(now);
        }
        if target.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_succeed() {
        let mut job = Job::new("kw".into(), JobSettings::default(), 0, "tester".into());
        job.transition(JobStatus::Processing).unwrap();
        assert!(job.started_at.is_some());
        job.transition(JobStatus::Completed).unwrap();
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut job = Job::new("kw".into(), JobSettings::default(), 0, "tester".into());
        let err = job.transition(JobStatus::Completed).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::IllegalTransition { .. }
        ));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut job = Job::new("kw".into(), JobSettings::default(), 0, "tester".into());
        job.transition(JobStatus::Processing).unwrap();
        job.transition(JobStatus::Cancelled).unwrap();
        assert!(job.transition(JobStatus::Processing).is_err());
    }

    #[test]
    fn settings_reject_all_agents_skipped() {
        let mut settings = JobSettings::default();
        settings.skip_agents = AgentType::ALL.iter().copied().collect();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_reject_out_of_range_iterations() {
        let mut settings = JobSettings::default();
        settings.max_iterations = 11;
        assert!(settings.validate().is_err());
    }
}
