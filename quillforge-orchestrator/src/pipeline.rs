//! ABOUTME: The pipeline execution algorithm (§4.6) — the Orchestrator's `run_job`
//! ABOUTME: drives research -> writer -> seo -> qa -> project_manager with a QA -> writer back-edge

use crate::compensation::CompensationHook;
use crate::metrics::Metrics;
use crate::progress::compute_progress;
use chrono::Utc;
use quillforge_agents::registry::AgentRegistry;
use quillforge_core::agent_io::{
    AgentRequest, AgentResponse, KeywordData, PmInput, QaInput, QaOutput, ResearchInput, ResearchOutput, SeoInput,
    SeoOutput, WriterInput, WriterOutput,
};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::ids::{JobId, StepId};
use quillforge_core::job::{Job, JobStatus};
use quillforge_core::persona::Persona;
use quillforge_core::step::{Step, StepStatus};
use quillforge_core::traits::agent::AgentContext;
use quillforge_core::traits::repository::{JobPatch, Repository, StepPatch};
use quillforge_core::traits::research::ResearchSource;
use quillforge_providers::registry::ProviderManager;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `{success, iterations, error?, cancelled?, jobId}` (§4.6 "Return value").
#[derive(Debug, Clone)]
pub struct JobRunResult {
    pub success: bool,
    pub iterations: u32,
    pub error: Option<String>,
    pub cancelled: bool,
    pub job_id: JobId,
}

pub struct Orchestrator {
    agents: Arc<AgentRegistry>,
    repository: Arc<dyn Repository>,
    research_source: Arc<dyn ResearchSource>,
    provider_manager: Arc<ProviderManager>,
    compensation_hook: Arc<dyn CompensationHook>,
    metrics: Arc<Metrics>,
}

/// Accumulated outputs of the already-run agents, threaded through the
/// pipeline and re-packaged as the next agent's typed input.
#[derive(Default)]
struct Artifacts {
    research: Option<ResearchOutput>,
    writer: Option<WriterOutput>,
    seo: Option<SeoOutput>,
    qa: Option<QaOutput>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        agents: Arc<AgentRegistry>,
        repository: Arc<dyn Repository>,
        research_source: Arc<dyn ResearchSource>,
        provider_manager: Arc<ProviderManager>,
        compensation_hook: Arc<dyn CompensationHook>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            agents,
            repository,
            research_source,
            provider_manager,
            compensation_hook,
            metrics,
        }
    }

    pub async fn run_job(&self, mut job: Job) -> JobRunResult {
        self.metrics.record_job_started();

        if self.is_cancelled(job.id).await {
            self.terminate_cancelled(&mut job).await;
            return JobRunResult {
                success: false,
                iterations: job.current_iteration,
                error: None,
                cancelled: true,
                job_id: job.id,
            };
        }

        if let Err(err) = self.transition_and_persist(&mut job, JobStatus::Processing).await {
            return self.unrecoverable(&mut job, err).await;
        }

        match self.run_pipeline(&mut job).await {
            Ok(result) => result,
            Err(err) => self.unrecoverable(&mut job, err).await,
        }
    }

    async fn run_pipeline(&self, job: &mut Job) -> Result<JobRunResult> {
        let mut artifacts = Artifacts::default();
        let mut completed_weight: u8 = 0;
        let mut base_weight_after_research: u8 = 0;

        if !job.settings.skip_agents.contains(&AgentType::Research) {
            if self.is_cancelled(job.id).await {
                return Ok(self.cancel_result(job).await);
            }
            let request = AgentRequest::Research(ResearchInput {
                keyword: job.keyword.clone(),
                context: job.settings.context.clone(),
                target_word_count: Some(job.settings.target_word_count),
            });
            let outcome = self.run_step(job, AgentType::Research, request).await?;
            let AgentResponse::Research(output) = outcome else {
                return Err(PipelineError::internal("research agent returned the wrong output type"));
            };
            artifacts.research = Some(output);
            completed_weight += AgentType::Research.progress_weight();
        } else {
            artifacts.research = Some(default_research_output(job));
        }
        base_weight_after_research = completed_weight;
        self.report_progress(job, completed_weight, false).await?;

        if job.settings.skip_agents.contains(&AgentType::Writer) {
            return Err(PipelineError::validation("the writer agent cannot be skipped"));
        }

        let mut previous_article: Option<String> = None;
        let mut qa_feedback: Option<String> = None;
        let mut issues_to_fix = None;

        loop {
            if self.is_cancelled(job.id).await {
                return Ok(self.cancel_result(job).await);
            }

            let research_data = artifacts
                .research
                .clone()
                .ok_or_else(|| PipelineError::internal("research artifact missing before writer"))?;
            let writer_request = AgentRequest::Writer(WriterInput {
                keyword: job.keyword.clone(),
                research_data: research_data.clone(),
                target_word_count: research_data.recommended_word_count,
                qa_feedback: qa_feedback.take(),
                issues_to_fix: issues_to_fix.take(),
                previous_article: previous_article.clone(),
                iteration: Some(job.current_iteration),
            });
            let outcome = self.run_step(job, AgentType::Writer, writer_request).await?;
            let AgentResponse::Writer(writer_output) = outcome else {
                return Err(PipelineError::internal("writer agent returned the wrong output type"));
            };
            artifacts.writer = Some(writer_output);
            completed_weight = base_weight_after_research + AgentType::Writer.progress_weight();
            self.report_progress(job, completed_weight, false).await?;

            if !job.settings.skip_agents.contains(&AgentType::Seo) {
                if self.is_cancelled(job.id).await {
                    return Ok(self.cancel_result(job).await);
                }
                let seo_request = AgentRequest::Seo(SeoInput {
                    keyword: job.keyword.clone(),
                    article: artifacts.writer.clone().expect("writer just ran"),
                    research_data: research_data.clone(),
                });
                let outcome = self.run_step(job, AgentType::Seo, seo_request).await?;
                let AgentResponse::Seo(seo_output) = outcome else {
                    return Err(PipelineError::internal("seo agent returned the wrong output type"));
                };
                artifacts.seo = Some(seo_output);
                completed_weight = base_weight_after_research
                    + AgentType::Writer.progress_weight()
                    + AgentType::Seo.progress_weight();
                self.report_progress(job, completed_weight, false).await?;
            }

            let qa_skipped = job.settings.skip_agents.contains(&AgentType::Qa);
            if !qa_skipped {
                if self.is_cancelled(job.id).await {
                    return Ok(self.cancel_result(job).await);
                }
                let seo_output_for_qa = artifacts.seo.clone().unwrap_or_else(|| placeholder_seo_output(&artifacts));
                let qa_request = AgentRequest::Qa(QaInput {
                    keyword: job.keyword.clone(),
                    article: artifacts.writer.clone().expect("writer just ran"),
                    seo_data: seo_output_for_qa,
                    iteration: job.current_iteration,
                    previous_issues: artifacts.qa.as_ref().map(|qa| qa.issues.clone()),
                });
                let outcome = self.run_step(job, AgentType::Qa, qa_request).await?;
                let AgentResponse::Qa(qa_output) = outcome else {
                    return Err(PipelineError::internal("qa agent returned the wrong output type"));
                };
                completed_weight = base_weight_after_research
                    + AgentType::Writer.progress_weight()
                    + AgentType::Seo.progress_weight()
                    + AgentType::Qa.progress_weight();
                self.report_progress(job, completed_weight, false).await?;

                let should_retry =
                    !qa_output.passed && job.current_iteration < job.max_iterations;
                artifacts.qa = Some(qa_output.clone());

                if should_retry {
                    info!(job_id = %job.id, iteration = job.current_iteration, "QA did not pass, looping back to writer");
                    job.current_iteration += 1;
                    self.repository
                        .update_job(
                            job.id,
                            JobPatch {
                                current_iteration: Some(job.current_iteration),
                                ..Default::default()
                            },
                        )
                        .await?;
                    previous_article = artifacts.writer.as_ref().map(|w| w.content.clone());
                    qa_feedback = Some(qa_output.feedback.clone());
                    issues_to_fix = Some(qa_output.issues.clone());
                    completed_weight = base_weight_after_research;
                    continue;
                }
            }

            break;
        }

        if self.is_cancelled(job.id).await {
            return Ok(self.cancel_result(job).await);
        }

        let pm_request = AgentRequest::ProjectManager(PmInput {
            keyword: job.keyword.clone(),
            article: artifacts.writer.clone().expect("writer always runs"),
            seo_data: artifacts.seo.clone(),
            qa_data: artifacts.qa.clone(),
            settings: job.settings.clone(),
        });
        let outcome = self.run_step(job, AgentType::ProjectManager, pm_request).await?;
        let AgentResponse::ProjectManager(pm_output) = outcome else {
            return Err(PipelineError::internal("project manager agent returned the wrong output type"));
        };

        let final_output = serde_json::to_value(&pm_output)
            .map_err(|e| PipelineError::internal(format!("failed to serialize final output: {e}")))?;

        job.transition(JobStatus::Completed)?;
        self.repository
            .update_job(
                job.id,
                JobPatch {
                    status: Some(JobStatus::Completed),
                    progress_percent: Some(compute_progress(completed_weight, true)),
                    final_output: Some(Some(final_output)),
                    current_agent: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        self.metrics.record_job_completed();

        Ok(JobRunResult {
            success: true,
            iterations: job.current_iteration,
            error: None,
            cancelled: false,
            job_id: job.id,
        })
    }

    /// Resolves persona + provider + agent, validates, records a step row, runs
    /// the agent, and persists the step outcome and running job totals.
    async fn run_step(&self, job: &mut Job, agent_type: AgentType, request: AgentRequest) -> Result<AgentResponse> {
        let persona = self.resolve_persona(job, agent_type).await?;
        let provider = self.provider_manager.get(&persona.provider).await?;
        let agent = self.agents.get(agent_type)?;

        agent.validate_input(&request).await?;

        let mut step = Step::new(job.id, agent_type, job.current_iteration);
        let input_json = serde_json::to_value(&request).ok();
        step.input = input_json;
        let step = self.repository.append_step(step).await?;

        self.repository
            .update_job(
                job.id,
                JobPatch {
                    current_agent: Some(Some(agent_type)),
                    ..Default::default()
                },
            )
            .await?;

        let ctx = AgentContext {
            job: job.clone(),
            persona,
            iteration: job.current_iteration,
            step_id: Some(step.id),
            provider,
            repository: Arc::clone(&self.repository),
            research_source: Arc::clone(&self.research_source),
            progress: None,
        };

        debug!(job_id = %job.id, %agent_type, "invoking agent");
        let outcome = agent.execute(request, ctx).await?;
        self.metrics.record_agent_tokens(agent_type, outcome.usage.total());

        job.total_tokens_used += u64::from(outcome.usage.total());
        job.estimated_cost_usd += outcome.cost_usd;
        self.repository
            .update_job(
                job.id,
                JobPatch {
                    total_tokens_used: Some(job.total_tokens_used),
                    estimated_cost_usd: Some(job.estimated_cost_usd),
                    ..Default::default()
                },
            )
            .await?;

        let duration_ms = (Utc::now() - step.started_at).num_milliseconds().max(0) as u64;

        if !outcome.success {
            let message = outcome.error.clone().unwrap_or_else(|| "agent reported failure".to_string());
            self.finish_step(step.id, false, None, Some(message.clone()), outcome.usage, duration_ms)
                .await;
            self.fail_job(job, message.clone()).await;
            return Err(PipelineError::internal(message));
        }

        let Some(output) = outcome.output else {
            let message = "agent reported success with no output".to_string();
            self.finish_step(step.id, false, None, Some(message.clone()), outcome.usage, duration_ms)
                .await;
            self.fail_job(job, message.clone()).await;
            return Err(PipelineError::internal(message));
        };

        let output_json = serde_json::to_value(&output).ok();
        self.finish_step(step.id, true, output_json, None, outcome.usage, duration_ms).await;
        Ok(output)
    }

    async fn finish_step(
        &self,
        step_id: StepId,
        success: bool,
        output: Option<Value>,
        error: Option<String>,
        usage: quillforge_core::agent_io::TokenUsage,
        duration_ms: u64,
    ) {
        let patch = StepPatch {
            status: Some(if success { StepStatus::Completed } else { StepStatus::Failed }),
            output,
            error_message: error,
            tokens_used: Some(usage.total()),
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: Some(usage.completion_tokens),
            duration_ms: Some(duration_ms),
        };
        if let Err(err) = self.repository.update_step(step_id, patch).await {
            warn!(%err, "failed to persist step completion");
        }
    }

    async fn resolve_persona(&self, job: &Job, agent_type: AgentType) -> Result<Persona> {
        if let Some(persona_id) = job.settings.persona_overrides.get(&agent_type) {
            return self
                .repository
                .get_persona(*persona_id)
                .await?
                .ok_or_else(|| PipelineError::PersonaNotFound(agent_type.as_str().to_string()));
        }
        self.repository
            .get_default_persona(agent_type)
            .await?
            .ok_or_else(|| PipelineError::PersonaNotFound(agent_type.as_str().to_string()))
    }

    async fn report_progress(&self, job: &mut Job, completed_weight: u8, pm_completed: bool) -> Result<()> {
        let progress = compute_progress(completed_weight, pm_completed);
        job.progress_percent = progress;
        self.repository
            .update_job(
                job.id,
                JobPatch {
                    progress_percent: Some(progress),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn is_cancelled(&self, job_id: JobId) -> bool {
        self.repository.is_cancelled(job_id).await.unwrap_or(false)
    }

    async fn transition_and_persist(&self, job: &mut Job, target: JobStatus) -> Result<()> {
        job.transition(target)?;
        self.repository
            .update_job(
                job.id,
                JobPatch {
                    status: Some(target),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn terminate_cancelled(&self, job: &mut Job) {
        if job.transition(JobStatus::Cancelled).is_ok() {
            let _ = self
                .repository
                .update_job(
                    job.id,
                    JobPatch {
                        status: Some(JobStatus::Cancelled),
                        ..Default::default()
                    },
                )
                .await;
        }
        self.metrics.record_job_cancelled();
    }

    async fn cancel_result(&self, job: &mut Job) -> JobRunResult {
        self.terminate_cancelled(job).await;
        JobRunResult {
            success: false,
            iterations: job.current_iteration,
            error: None,
            cancelled: true,
            job_id: job.id,
        }
    }

    async fn fail_job(&self, job: &mut Job, message: String) {
        if job.transition(JobStatus::Failed).is_ok() {
            let _ = self
                .repository
                .update_job(
                    job.id,
                    JobPatch {
                        status: Some(JobStatus::Failed),
                        last_error: Some(Some(message.clone())),
                        ..Default::default()
                    },
                )
                .await;
        }
        self.compensation_hook.compensate(job).await;
        self.metrics.record_job_failed();
        job.last_error = Some(message);
    }

    async fn unrecoverable(&self, job: &mut Job, err: PipelineError) -> JobRunResult {
        tracing::error!(job_id = %job.id, %err, "job failed");
        self.fail_job(job, err.to_string()).await;
        JobRunResult {
            success: false,
            iterations: job.current_iteration,
            error: Some(err.to_string()),
            cancelled: false,
            job_id: job.id,
        }
    }
}

fn default_research_output(job: &Job) -> ResearchOutput {
    let recommended_word_count = if job.settings.target_word_count > 0 {
        job.settings.target_word_count
    } else {
        1500
    };
    ResearchOutput {
        keyword: job.keyword.clone(),
        keyword_data: KeywordData::default(),
        competitors: Vec::new(),
        related_keywords: Vec::new(),
        paa_questions: Vec::new(),
        recommended_word_count,
        content_gaps: None,
    }
}

/// Used only when QA runs with SEO skipped; a minimal placeholder so `QaInput`
/// still has a well-formed `seo_data` field to analyze against.
fn placeholder_seo_output(_artifacts: &Artifacts) -> SeoOutput {
    SeoOutput {
        meta_title: String::new(),
        meta_description: String::new(),
        heading_analysis: quillforge_core::agent_io::HeadingAnalysis {
            is_valid: true,
            issues: Vec::new(),
            suggestions: Vec::new(),
        },
        keyword_density: quillforge_core::agent_io::KeywordDensity {
            percentage: 0.0,
            analysis: "SEO agent skipped".to_string(),
        },
        schema_markup: Value::Null,
        internal_links: None,
        optimization_score: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_research_output_uses_target_word_count_when_set() {
        let mut job = Job::new("kw".into(), quillforge_core::job::JobSettings::default(), 0, "tester".into());
        job.settings.target_word_count = 2200;
        let output = default_research_output(&job);
        assert_eq!(output.recommended_word_count, 2200);
    }

    #[test]
    fn default_research_output_falls_back_when_unset() {
        let job = Job::new("kw".into(), quillforge_core::job::JobSettings::default(), 0, "tester".into());
        let output = default_research_output(&job);
        assert_eq!(output.recommended_word_count, 1500);
    }
}
