//! ABOUTME: Job Repository capability (§4.5) — the seam `quillforge-storage` implements
//! ABOUTME: against the relational store; the orchestrator and worker depend on it by trait object

use crate::agent_type::AgentType;
use crate::eval::Eval;
use crate::ids::{JobId, PersonaId, StepId};
use crate::job::{Job, JobSettings, JobStatus};
use crate::persona::Persona;
use crate::step::Step;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partial update to a job row; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub current_agent: Option<Option<AgentType>>,
    pub current_iteration: Option<u32>,
    pub total_tokens_used: Option<u64>,
    pub estimated_cost_usd: Option<f64>,
    pub progress_percent: Option<u8>,
    pub final_output: Option<Option<serde_json::Value>>,
    pub page_id: Option<Option<uuid::Uuid>>,
    pub last_error: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub limit: u32,
    pub offset: u32,
    pub order_by: JobOrderBy,
    pub order_direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum JobOrderBy {
    #[default]
    CreatedAt,
    Priority,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListPage {
    pub jobs: Vec<Job>,
    pub total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StepPatch {
    pub status: Option<crate::step::StepStatus>,
    pub output: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub tokens_used: Option<u32>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogRow {
    pub entity_type: String,
    pub entity_id: String,
    pub level: LogLevel,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Durable CRUD for jobs, steps, eval records, personas, and system logs (§4.5, §6.2).
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_job(
        &self,
        keyword: String,
        settings: JobSettings,
        priority: i32,
        created_by: String,
    ) -> crate::error::Result<Job>;

    async fn get_job(&self, id: JobId) -> crate::error::Result<Option<Job>>;

    async fn update_job(&self, id: JobId, patch: JobPatch) -> crate::error::Result<Job>;

    async fn list_jobs(&self, query: JobListQuery) -> crate::error::Result<JobListPage>;

    /// Legal only from `pending` (§4.5); idempotent if already cancelled (§8).
    async fn cancel_job(&self, id: JobId, requested_by: String) -> crate::error::Result<Job>;

    /// Legal only from `failed` (§4.5).
    async fn retry_job(&self, id: JobId) -> crate::error::Result<Job>;

    /// Cheap read of the cooperative cancellation flag (§4.5, §4.6).
    async fn is_cancelled(&self, id: JobId) -> crate::error::Result<bool>;

    async fn append_step(&self, step: Step) -> crate::error::Result<Step>;

    async fn update_step(&self, id: StepId, patch: StepPatch) -> crate::error::Result<Step>;

    async fn insert_eval(&self, eval: Eval) -> crate::error::Result<Eval>;

    /// Atomically claim the highest-priority pending job, `(priority DESC,
    /// created_at ASC)`, and transition it to `processing` (§4.5, §4.7).
    async fn claim_next(&self) -> crate::error::Result<Option<Job>>;

    async fn get_persona(&self, id: PersonaId) -> crate::error::Result<Option<Persona>>;

    async fn get_default_persona(
        &self,
        agent_type: AgentType,
    ) -> crate::error::Result<Option<Persona>>;

    async fn list_personas(&self, agent_type: Option<AgentType>) -> crate::error::Result<Vec<Persona>>;

    async fn append_log(&self, row: SystemLogRow) -> crate::error::Result<()>;

    /// Last 100 rows for a job, newest first (§6.1 `GET /jobs/{id}/logs`).
    async fn recent_logs(&self, job_id: JobId, limit: u32) -> crate::error::Result<Vec<SystemLogRow>>;
}
