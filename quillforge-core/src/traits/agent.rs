//! ABOUTME: Uniform agent contract (§4.3) and the per-call context handed to every invocation

use crate::agent_io::{AgentOutcome, AgentRequest};
use crate::agent_type::AgentType;
use crate::ids::StepId;
use crate::job::Job;
use crate::persona::Persona;
use crate::traits::provider::LlmProvider;
use crate::traits::repository::{LogLevel, Repository, SystemLogRow};
use crate::traits::research::ResearchSource;
use async_trait::async_trait;
use std::sync::Arc;

/// Push callback for incremental progress (§4.3 context fields "a progress callback").
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Everything an agent invocation needs besides its typed input (§4.3 "Context
/// fields"). Agents never construct this themselves — the orchestrator does.
#[derive(Clone)]
pub struct AgentContext {
    pub job: Job,
    pub persona: Persona,
    pub iteration: u32,
    pub step_id: Option<StepId>,
    pub provider: Arc<dyn LlmProvider>,
    pub repository: Arc<dyn Repository>,
    pub research_source: Arc<dyn ResearchSource>,
    pub progress: Option<ProgressCallback>,
}

impl AgentContext {
    /// Write to both `tracing` and the persisted `system_logs` table — the
    /// structured log sink named in §3 Ownership and backing §6.1's logs endpoint.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(job_id = %self.job.id, "{message}"),
            LogLevel::Info => tracing::info!(job_id = %self.job.id, "{message}"),
            LogLevel::Warn => tracing::warn!(job_id = %self.job.id, "{message}"),
            LogLevel::Error => tracing::error!(job_id = %self.job.id, "{message}"),
        }
        let row = SystemLogRow {
            entity_type: "job".to_string(),
            entity_id: self.job.id.to_string(),
            level,
            message,
            data: None,
            created_at: chrono::Utc::now(),
        };
        if let Err(err) = self.repository.append_log(row).await {
            tracing::warn!(job_id = %self.job.id, %err, "failed to persist system log row");
        }
    }
}

/// A pure transformation step in the pipeline (§4.3).
///
/// Agents are stateless process-wide singletons; concurrent execution for
/// different jobs must be safe (§4.3 "Agents are stateless").
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn validate_input(&self, input: &AgentRequest) -> crate::error::Result<()>;

    /// JSON Schema descriptor for this agent's output shape, used by
    /// `generateJSON` (§4.1) to validate LLM responses and by the registry
    /// for introspection.
    fn output_schema(&self) -> serde_json::Value;

    /// `success = true` implies `output` matches the agent's declared output
    /// shape; usage is reported regardless of success (§4.3 "Success contract").
    async fn execute(&self, input: AgentRequest, ctx: AgentContext) -> crate::error::Result<AgentOutcome>;
}
