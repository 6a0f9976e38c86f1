//! ABOUTME: In-memory Repository double backed by parking_lot locks, mirroring the
//! ABOUTME: Postgres implementation's transition rules without needing a database

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::eval::Eval;
use quillforge_core::ids::{JobId, PersonaId, StepId};
use quillforge_core::job::{Job, JobSettings, JobStatus};
use quillforge_core::persona::Persona;
use quillforge_core::step::Step;
use quillforge_core::traits::repository::{
    JobListPage, JobListQuery, JobOrderBy, JobPatch, OrderDirection, Repository, StepPatch, SystemLogRow,
};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct MockRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    cancel_requested: RwLock<HashSet<JobId>>,
    steps: RwLock<HashMap<StepId, Step>>,
    evals: RwLock<Vec<Eval>>,
    personas: RwLock<HashMap<PersonaId, Persona>>,
    logs: RwLock<Vec<SystemLogRow>>,
}

impl MockRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a persona directly, bypassing any CRUD endpoint (for test setup).
    pub fn seed_persona(&self, persona: Persona) {
        self.personas.write().insert(persona.id, persona);
    }

    /// Seeds a job directly, bypassing `create_job` (for test setup).
    pub fn seed_job(&self, job: Job) {
        self.jobs.write().insert(job.id, job);
    }

    fn apply_job_patch(job: &mut Job, patch: JobPatch) {
        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(current_agent) = patch.current_agent {
            job.current_agent = current_agent;
        }
        if let Some(current_iteration) = patch.current_iteration {
            job.current_iteration = current_iteration;
        }
        if let Some(total_tokens_used) = patch.total_tokens_used {
            job.total_tokens_used = total_tokens_used;
        }
        if let Some(estimated_cost_usd) = patch.estimated_cost_usd {
            job.estimated_cost_usd = estimated_cost_usd;
        }
        if let Some(progress_percent) = patch.progress_percent {
            job.progress_percent = progress_percent;
        }
        if let Some(final_output) = patch.final_output {
            job.final_output = final_output;
        }
        if let Some(page_id) = patch.page_id {
            job.page_id = page_id;
        }
        if let Some(last_error) = patch.last_error {
            job.last_error = last_error;
        }
        job.updated_at = Utc::now();
        if job.status.is_terminal() {
            job.completed_at = Some(job.updated_at);
        }
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn create_job(
        &self,
        keyword: String,
        settings: JobSettings,
        priority: i32,
        created_by: String,
    ) -> Result<Job> {
        let job = Job::new(keyword, settings, priority, created_by);
        self.jobs.write().insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().get(&id).cloned())
    }

    async fn update_job(&self, id: JobId, patch: JobPatch) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;
        Self::apply_job_patch(job, patch);
        Ok(job.clone())
    }

    async fn list_jobs(&self, query: JobListQuery) -> Result<JobListPage> {
        let jobs = self.jobs.read();
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| query.status.is_none_or(|s| job.status == s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.order_by {
                JobOrderBy::CreatedAt => a.created_at.cmp(&b.created_at),
                JobOrderBy::Priority => a.priority.cmp(&b.priority),
            };
            match query.order_direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            }
        });

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.max(1) as usize)
            .collect();
        Ok(JobListPage { jobs: page, total })
    }

    async fn cancel_job(&self, id: JobId, _requested_by: String) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;

        if job.status == JobStatus::Cancelled {
            return Ok(job.clone());
        }

        match job.status {
            JobStatus::Pending => {
                job.transition(JobStatus::Cancelled)?;
                Ok(job.clone())
            }
            JobStatus::Processing => {
                self.cancel_requested.write().insert(id);
                job.updated_at = Utc::now();
                Ok(job.clone())
            }
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                Err(PipelineError::IllegalTransition {
                    message: "Cannot cancel job that is not pending or processing".to_string(),
                })
            }
        }
    }

    async fn retry_job(&self, id: JobId) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;
        if job.status != JobStatus::Failed {
            return Err(PipelineError::IllegalTransition {
                message: "Can only retry failed jobs".to_string(),
            });
        }
        job.status = JobStatus::Pending;
        job.current_iteration = 1;
        job.last_error = None;
        job.completed_at = None;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn is_cancelled(&self, id: JobId) -> Result<bool> {
        let jobs = self.jobs.read();
        let job = jobs.get(&id).ok_or_else(|| PipelineError::not_found(format!("job {id} not found")))?;
        Ok(self.cancel_requested.read().contains(&id) || job.status == JobStatus::Cancelled)
    }

    async fn append_step(&self, step: Step) -> Result<Step> {
        self.steps.write().insert(step.id, step.clone());
        Ok(step)
    }

    async fn update_step(&self, id: StepId, patch: StepPatch) -> Result<Step> {
        let mut steps = self.steps.write();
        let step = steps.get_mut(&id).ok_or_else(|| PipelineError::not_found(format!("step {id} not found")))?;
        if let Some(status) = patch.status {
            step.status = status;
        }
        if let Some(output) = patch.output {
            step.output = Some(output);
        }
        if let Some(error_message) = patch.error_message {
            step.error_message = Some(error_message);
        }
        if let Some(tokens_used) = patch.tokens_used {
            step.tokens_used = tokens_used;
        }
        if let Some(prompt_tokens) = patch.prompt_tokens {
            step.prompt_tokens = prompt_tokens;
        }
        if let Some(completion_tokens) = patch.completion_tokens {
            step.completion_tokens = completion_tokens;
        }
        if let Some(duration_ms) = patch.duration_ms {
            step.duration_ms = Some(duration_ms);
        }
        step.completed_at = Some(Utc::now());
        Ok(step.clone())
    }

    async fn insert_eval(&self, eval: Eval) -> Result<Eval> {
        self.evals.write().push(eval.clone());
        Ok(eval)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write();
        let candidate_id = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.created_at.cmp(&a.created_at)))
            .map(|job| job.id);

        let Some(id) = candidate_id else {
            return Ok(None);
        };
        let job = jobs.get_mut(&id).expect("candidate id came from this map");
        job.transition(JobStatus::Processing)?;
        Ok(Some(job.clone()))
    }

    async fn get_persona(&self, id: PersonaId) -> Result<Option<Persona>> {
        Ok(self.personas.read().get(&id).cloned())
    }

    async fn get_default_persona(&self, agent_type: AgentType) -> Result<Option<Persona>> {
        Ok(self
            .personas
            .read()
            .values()
            .find(|p| p.agent_type == agent_type && p.is_default && p.is_active())
            .cloned())
    }

    async fn list_personas(&self, agent_type: Option<AgentType>) -> Result<Vec<Persona>> {
        Ok(self
            .personas
            .read()
            .values()
            .filter(|p| agent_type.is_none_or(|t| p.agent_type == t))
            .cloned()
            .collect())
    }

    async fn append_log(&self, row: SystemLogRow) -> Result<()> {
        self.logs.write().push(row);
        Ok(())
    }

    async fn recent_logs(&self, job_id: JobId, limit: u32) -> Result<Vec<SystemLogRow>> {
        let mut matching: Vec<SystemLogRow> = self
            .logs
            .read()
            .iter()
            .filter(|row| row.entity_type == "job" && row.entity_id == job_id.to_string())
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillforge_core::job::JobSettings;

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let repo = MockRepository::new();
        let job = repo.create_job("kw".into(), JobSettings::default(), 0, "tester".into()).await.unwrap();
        let fetched = repo.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
    }

    #[tokio::test]
    async fn cancel_pending_job_transitions_immediately() {
        let repo = MockRepository::new();
        let job = repo.create_job("kw".into(), JobSettings::default(), 0, "tester".into()).await.unwrap();
        let cancelled = repo.cancel_job(job.id, "tester".into()).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_processing_job_only_raises_the_flag() {
        let repo = MockRepository::new();
        let job = repo.create_job("kw".into(), JobSettings::default(), 0, "tester".into()).await.unwrap();
        repo.update_job(job.id, JobPatch { status: Some(JobStatus::Processing), ..Default::default() })
            .await
            .unwrap();
        let returned = repo.cancel_job(job.id, "tester".into()).await.unwrap();
        assert_eq!(returned.status, JobStatus::Processing);
        assert!(repo.is_cancelled(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn claim_next_prefers_higher_priority() {
        let repo = MockRepository::new();
        let low = repo.create_job("low".into(), JobSettings::default(), 0, "tester".into()).await.unwrap();
        let high = repo.create_job("high".into(), JobSettings::default(), 5, "tester".into()).await.unwrap();
        let claimed = repo.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.id, high.id);
        assert_ne!(claimed.id, low.id);
    }

    #[tokio::test]
    async fn retry_requires_failed_status() {
        let repo = MockRepository::new();
        let job = repo.create_job("kw".into(), JobSettings::default(), 0, "tester".into()).await.unwrap();
        assert!(repo.retry_job(job.id).await.is_err());
    }
}
