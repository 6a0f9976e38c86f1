//! ABOUTME: PostgreSQL implementation of the `Repository` trait (§4.5)
//! ABOUTME: `claim_next` uses `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent workers never double-claim

use crate::codec::{
    agent_type_from_text, agent_type_to_text, job_status_from_text, job_status_to_text,
    log_level_from_text, log_level_to_text, step_status_from_text, step_status_to_text,
};
use crate::config::PostgresConfig;
use crate::pool;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::eval::Eval;
use quillforge_core::ids::{JobId, PersonaId, StepId};
use quillforge_core::job::{Job, JobSettings, JobStatus};
use quillforge_core::persona::Persona;
use quillforge_core::step::{Step, StepStatus};
use quillforge_core::traits::repository::{
    JobListPage, JobListQuery, JobOrderBy, JobPatch, OrderDirection, Repository, StepPatch,
    SystemLogRow,
};
use tokio_postgres::Row;

pub struct PostgresRepository {
    pool: Pool,
}

impl PostgresRepository {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let pool = pool::connect(&config).await?;
        Ok(Self { pool })
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| PipelineError::Storage {
            message: format!("failed to acquire pooled connection: {e}"),
            source: Some(Box::new(e)),
        })
    }

    pub async fn is_healthy(&self) -> bool {
        let Ok(client) = self.client().await else {
            return false;
        };
        client.simple_query("SELECT 1").await.is_ok()
    }
}

fn storage_err(e: tokio_postgres::Error) -> PipelineError {
    PipelineError::Storage {
        message: format!("query failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn row_to_job(row: &Row) -> Result<Job> {
    let settings_json: serde_json::Value = row.get("settings");
    let settings: JobSettings = serde_json::from_value(settings_json)
        .map_err(|e| PipelineError::internal(format!("corrupt job settings in row: {e}")))?;
    let current_agent: Option<String> = row.get("current_agent");
    let status_text: String = row.get("status");

    Ok(Job {
        id: JobId::from_uuid(row.get("id")),
        keyword: row.get("keyword"),
        status: job_status_from_text(&status_text)?,
        current_agent: current_agent.map(|s| agent_type_from_text(&s)).transpose()?,
        current_iteration: u32::try_from(row.get::<_, i32>("current_iteration")).unwrap_or(1),
        max_iterations: u32::try_from(row.get::<_, i32>("max_iterations")).unwrap_or(5),
        total_tokens_used: u64::try_from(row.get::<_, i64>("total_tokens_used")).unwrap_or(0),
        estimated_cost_usd: row.get("estimated_cost_usd"),
        progress_percent: u8::try_from(row.get::<_, i16>("progress_percent")).unwrap_or(0),
        priority: row.get("priority"),
        settings,
        final_output: row.get("final_output"),
        page_id: row.get("page_id"),
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
    })
}

fn row_to_step(row: &Row) -> Result<Step> {
    let agent_type_text: String = row.get("agent_type");
    let status_text: String = row.get("status");
    let duration_ms: Option<i64> = row.get("duration_ms");
    let logs: Vec<String> = row.get("logs");

    Ok(Step {
        id: StepId::from_uuid(row.get("id")),
        job_id: JobId::from_uuid(row.get("job_id")),
        agent_type: agent_type_from_text(&agent_type_text)?,
        iteration: u32::try_from(row.get::<_, i32>("iteration")).unwrap_or(1),
        status: step_status_from_text(&status_text)?,
        tokens_used: u32::try_from(row.get::<_, i32>("tokens_used")).unwrap_or(0),
        prompt_tokens: u32::try_from(row.get::<_, i32>("prompt_tokens")).unwrap_or(0),
        completion_tokens: u32::try_from(row.get::<_, i32>("completion_tokens")).unwrap_or(0),
        duration_ms: duration_ms.map(|v| v.max(0) as u64),
        input: row.get("input"),
        output: row.get("output"),
        logs,
        error_message: row.get("error_message"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    })
}

fn row_to_persona(row: &Row) -> Result<Persona> {
    let agent_type_text: String = row.get("agent_type");
    Ok(Persona {
        id: PersonaId::from_uuid(row.get("id")),
        agent_type: agent_type_from_text(&agent_type_text)?,
        name: row.get("name"),
        system_prompt: row.get("system_prompt"),
        provider: row.get("provider"),
        model: row.get("model"),
        temperature: row.get("temperature"),
        max_tokens: u32::try_from(row.get::<_, i32>("max_tokens")).unwrap_or(0),
        is_default: row.get("is_default"),
        is_enabled: row.get("is_enabled"),
        deleted_at: row.get("deleted_at"),
    })
}

fn row_to_log(row: &Row) -> Result<SystemLogRow> {
    let level_text: String = row.get("level");
    Ok(SystemLogRow {
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        level: log_level_from_text(&level_text)?,
        message: row.get("message"),
        data: row.get("data"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_job(
        &self,
        keyword: String,
        settings: JobSettings,
        priority: i32,
        created_by: String,
    ) -> Result<Job> {
        settings.validate()?;
        let job = Job::new(keyword, settings, priority, created_by);
        let client = self.client().await?;
        let settings_json = serde_json::to_value(&job.settings)
            .map_err(|e| PipelineError::internal(format!("failed to serialize settings: {e}")))?;

        client
            .execute(
                "INSERT INTO jobs (id, keyword, status, current_iteration, max_iterations, \
                 total_tokens_used, estimated_cost_usd, progress_percent, priority, settings, \
                 created_at, updated_at, created_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                &[
                    &job.id.uuid(),
                    &job.keyword,
                    &job_status_to_text(job.status),
                    &i32::try_from(job.current_iteration).unwrap_or(1),
                    &i32::try_from(job.max_iterations).unwrap_or(5),
                    &0i64,
                    &0.0f64,
                    &0i16,
                    &job.priority,
                    &settings_json,
                    &job.created_at,
                    &job.updated_at,
                    &job.created_by,
                ],
            )
            .await
            .map_err(storage_err)?;

        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT * FROM jobs WHERE id = $1", &[&id.uuid()])
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_job).transpose()
    }

    #[allow(clippy::too_many_lines)]
    async fn update_job(&self, id: JobId, patch: JobPatch) -> Result<Job> {
        let client = self.client().await?;
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> = Vec::new();

        if let Some(status) = patch.status {
            params.push(Box::new(job_status_to_text(status)));
            sets.push(format!("status = ${}", params.len()));
        }
        if let Some(current_agent) = patch.current_agent {
            params.push(Box::new(current_agent.map(agent_type_to_text)));
            sets.push(format!("current_agent = ${}", params.len()));
        }
        if let Some(iteration) = patch.current_iteration {
            params.push(Box::new(i32::try_from(iteration).unwrap_or(1)));
            sets.push(format!("current_iteration = ${}", params.len()));
        }
        if let Some(tokens) = patch.total_tokens_used {
            params.push(Box::new(i64::try_from(tokens).unwrap_or(i64::MAX)));
            sets.push(format!("total_tokens_used = ${}", params.len()));
        }
        if let Some(cost) = patch.estimated_cost_usd {
            params.push(Box::new(cost));
            sets.push(format!("estimated_cost_usd = ${}", params.len()));
        }
        if let Some(progress) = patch.progress_percent {
            params.push(Box::new(i16::from(progress)));
            sets.push(format!("progress_percent = ${}", params.len()));
        }
        if let Some(final_output) = patch.final_output {
            params.push(Box::new(final_output));
            sets.push(format!("final_output = ${}", params.len()));
        }
        if let Some(page_id) = patch.page_id {
            params.push(Box::new(page_id));
            sets.push(format!("page_id = ${}", params.len()));
        }
        if let Some(last_error) = patch.last_error {
            params.push(Box::new(last_error));
            sets.push(format!("last_error = ${}", params.len()));
        }

        if sets.is_empty() {
            return self
                .get_job(id)
                .await?
                .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")));
        }

        sets.push("updated_at = now()".to_string());
        params.push(Box::new(id.uuid()));
        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            params.len()
        );
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

        let row = client
            .query_opt(&sql, &refs)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;
        row_to_job(&row)
    }

    async fn list_jobs(&self, query: JobListQuery) -> Result<JobListPage> {
        let client = self.client().await?;
        let order_col = match query.order_by {
            JobOrderBy::CreatedAt => "created_at",
            JobOrderBy::Priority => "priority",
        };
        let order_dir = match query.order_direction {
            OrderDirection::Ascending => "ASC",
            OrderDirection::Descending => "DESC",
        };

        let (where_clause, status_param) = match query.status {
            Some(status) => (" WHERE status = $1", Some(job_status_to_text(status))),
            None => ("", None),
        };

        let limit = i64::from(query.limit.min(100));
        let offset = i64::from(query.offset);

        let (rows, total) = if let Some(status_text) = status_param {
            let sql = format!(
                "SELECT * FROM jobs{where_clause} ORDER BY {order_col} {order_dir} LIMIT $2 OFFSET $3"
            );
            let rows = client
                .query(&sql, &[&status_text, &limit, &offset])
                .await
                .map_err(storage_err)?;
            let total: i64 = client
                .query_one("SELECT count(*) FROM jobs WHERE status = $1", &[&status_text])
                .await
                .map_err(storage_err)?
                .get(0);
            (rows, total)
        } else {
            let sql = format!("SELECT * FROM jobs ORDER BY {order_col} {order_dir} LIMIT $1 OFFSET $2");
            let rows = client.query(&sql, &[&limit, &offset]).await.map_err(storage_err)?;
            let total: i64 = client
                .query_one("SELECT count(*) FROM jobs", &[])
                .await
                .map_err(storage_err)?
                .get(0);
            (rows, total)
        };

        let jobs = rows.iter().map(row_to_job).collect::<Result<Vec<_>>>()?;
        Ok(JobListPage {
            jobs,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn cancel_job(&self, id: JobId, _requested_by: String) -> Result<Job> {
        let client = self.client().await?;
        let existing = self
            .get_job(id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;

        // Idempotent: cancelling an already-cancelled job is a no-op (§8).
        if existing.status == JobStatus::Cancelled {
            return Ok(existing);
        }

        // From `pending` the transition is immediate. From `processing` there is
        // no legal direct status edge to `cancelled` (§4.6 state machine), so we
        // only raise the cooperative flag and let the orchestrator observe it at
        // the next step boundary via `is_cancelled` (§4.5 "cancel while processing").
        match existing.status {
            JobStatus::Pending => {
                let row = client
                    .query_opt(
                        "UPDATE jobs SET status = $1, completed_at = now(), updated_at = now() \
                         WHERE id = $2 AND status = 'pending' RETURNING *",
                        &[&job_status_to_text(JobStatus::Cancelled), &id.uuid()],
                    )
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| PipelineError::IllegalTransition {
                        message: "Cannot cancel job that is not pending".to_string(),
                    })?;
                row_to_job(&row)
            }
            JobStatus::Processing => {
                let row = client
                    .query_opt(
                        "UPDATE jobs SET cancel_requested = true, updated_at = now() \
                         WHERE id = $1 AND status = 'processing' RETURNING *",
                        &[&id.uuid()],
                    )
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| PipelineError::IllegalTransition {
                        message: "Cannot cancel job that is not pending or processing".to_string(),
                    })?;
                row_to_job(&row)
            }
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => Err(PipelineError::IllegalTransition {
                message: "Cannot cancel job that is not pending or processing".to_string(),
            }),
        }
    }

    async fn retry_job(&self, id: JobId) -> Result<Job> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "UPDATE jobs SET status = $1, current_iteration = 1, last_error = NULL, \
                 completed_at = NULL, updated_at = now() \
                 WHERE id = $2 AND status = 'failed' RETURNING *",
                &[&job_status_to_text(JobStatus::Pending), &id.uuid()],
            )
            .await
            .map_err(storage_err)?
            .ok_or_else(|| PipelineError::IllegalTransition {
                message: "Can only retry failed jobs".to_string(),
            })?;
        row_to_job(&row)
    }

    async fn is_cancelled(&self, id: JobId) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT status, cancel_requested FROM jobs WHERE id = $1", &[&id.uuid()])
            .await
            .map_err(storage_err)?
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;
        let status_text: String = row.get("status");
        let cancel_requested: bool = row.get("cancel_requested");
        Ok(cancel_requested || job_status_from_text(&status_text)? == JobStatus::Cancelled)
    }

    async fn append_step(&self, step: Step) -> Result<Step> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO job_steps (id, job_id, agent_type, iteration, status, tokens_used, \
                 prompt_tokens, completion_tokens, duration_ms, input, output, logs, \
                 error_message, started_at, completed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
                &[
                    &step.id.uuid(),
                    &step.job_id.uuid(),
                    &agent_type_to_text(step.agent_type),
                    &i32::try_from(step.iteration).unwrap_or(1),
                    &step_status_to_text(step.status),
                    &i32::try_from(step.tokens_used).unwrap_or(0),
                    &i32::try_from(step.prompt_tokens).unwrap_or(0),
                    &i32::try_from(step.completion_tokens).unwrap_or(0),
                    &step.duration_ms.and_then(|v| i64::try_from(v).ok()),
                    &step.input,
                    &step.output,
                    &step.logs,
                    &step.error_message,
                    &step.started_at,
                    &step.completed_at,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(step)
    }

    #[allow(clippy::too_many_lines)]
    async fn update_step(&self, id: StepId, patch: StepPatch) -> Result<Step> {
        let client = self.client().await?;
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> = Vec::new();

        if let Some(status) = patch.status {
            let completed_now = matches!(status, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped);
            params.push(Box::new(step_status_to_text(status)));
            sets.push(format!("status = ${}", params.len()));
            if completed_now {
                sets.push("completed_at = now()".to_string());
            }
        }
        if let Some(output) = patch.output {
            params.push(Box::new(output));
            sets.push(format!("output = ${}", params.len()));
        }
        if let Some(error_message) = patch.error_message {
            params.push(Box::new(error_message));
            sets.push(format!("error_message = ${}", params.len()));
        }
        if let Some(tokens) = patch.tokens_used {
            params.push(Box::new(i32::try_from(tokens).unwrap_or(0)));
            sets.push(format!("tokens_used = ${}", params.len()));
        }
        if let Some(prompt_tokens) = patch.prompt_tokens {
            params.push(Box::new(i32::try_from(prompt_tokens).unwrap_or(0)));
            sets.push(format!("prompt_tokens = ${}", params.len()));
        }
        if let Some(completion_tokens) = patch.completion_tokens {
            params.push(Box::new(i32::try_from(completion_tokens).unwrap_or(0)));
            sets.push(format!("completion_tokens = ${}", params.len()));
        }
        if let Some(duration_ms) = patch.duration_ms {
            params.push(Box::new(i64::try_from(duration_ms).unwrap_or(i64::MAX)));
            sets.push(format!("duration_ms = ${}", params.len()));
        }

        if sets.is_empty() {
            let row = client
                .query_opt("SELECT * FROM job_steps WHERE id = $1", &[&id.uuid()])
                .await
                .map_err(storage_err)?
                .ok_or_else(|| PipelineError::not_found(format!("step {id} not found")))?;
            return row_to_step(&row);
        }

        params.push(Box::new(id.uuid()));
        let sql = format!(
            "UPDATE job_steps SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            params.len()
        );
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();
        let row = client
            .query_opt(&sql, &refs)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| PipelineError::not_found(format!("step {id} not found")))?;
        row_to_step(&row)
    }

    async fn insert_eval(&self, eval: Eval) -> Result<Eval> {
        let client = self.client().await?;
        let dimension_scores_json = serde_json::to_value(eval.dimension_scores)
            .map_err(|e| PipelineError::internal(format!("failed to serialize dimension scores: {e}")))?;
        let issues_json = serde_json::to_value(&eval.issues)
            .map_err(|e| PipelineError::internal(format!("failed to serialize issues: {e}")))?;

        client
            .execute(
                "INSERT INTO job_evals (id, step_id, iteration, overall_score, dimension_scores, \
                 passed, issues, feedback) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &eval.id.uuid(),
                    &eval.step_id.uuid(),
                    &i32::try_from(eval.iteration).unwrap_or(1),
                    &i16::from(eval.overall_score),
                    &dimension_scores_json,
                    &eval.passed,
                    &issues_json,
                    &eval.feedback,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(eval)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "UPDATE jobs SET status = 'processing', started_at = now(), updated_at = now() \
                 WHERE id = ( \
                     SELECT id FROM jobs \
                     WHERE status = 'pending' \
                     ORDER BY priority DESC, created_at ASC \
                     LIMIT 1 \
                     FOR UPDATE SKIP LOCKED \
                 ) \
                 RETURNING *",
                &[],
            )
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn get_persona(&self, id: PersonaId) -> Result<Option<Persona>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT * FROM personas WHERE id = $1", &[&id.uuid()])
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_persona).transpose()
    }

    async fn get_default_persona(&self, agent_type: AgentType) -> Result<Option<Persona>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT * FROM personas WHERE agent_type = $1 AND is_default = true \
                 AND is_enabled = true AND deleted_at IS NULL LIMIT 1",
                &[&agent_type_to_text(agent_type)],
            )
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_persona).transpose()
    }

    async fn list_personas(&self, agent_type: Option<AgentType>) -> Result<Vec<Persona>> {
        let client = self.client().await?;
        let rows = if let Some(agent_type) = agent_type {
            client
                .query(
                    "SELECT * FROM personas WHERE agent_type = $1 AND deleted_at IS NULL",
                    &[&agent_type_to_text(agent_type)],
                )
                .await
                .map_err(storage_err)?
        } else {
            client
                .query("SELECT * FROM personas WHERE deleted_at IS NULL", &[])
                .await
                .map_err(storage_err)?
        };
        rows.iter().map(row_to_persona).collect()
    }

    async fn append_log(&self, row: SystemLogRow) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO system_logs (id, entity_type, entity_id, level, message, data, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &uuid::Uuid::new_v4(),
                    &row.entity_type,
                    &row.entity_id,
                    &log_level_to_text(row.level),
                    &row.message,
                    &row.data,
                    &row.created_at,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn recent_logs(&self, job_id: JobId, limit: u32) -> Result<Vec<SystemLogRow>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT * FROM system_logs WHERE entity_type = 'job' AND entity_id = $1 \
                 ORDER BY created_at DESC LIMIT $2",
                &[&job_id.to_string(), &i64::from(limit.min(100))],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_log).collect()
    }
}

