//! ABOUTME: QA Agent (§4.3) — deterministic prohibited-pattern scan merged with
//! ABOUTME: LLM dimension scoring; persists an `Eval` row keyed to the current step

use async_trait::async_trait;
use quillforge_core::agent_io::{AgentOutcome, AgentRequest, AgentResponse, QaInput, QaOutput};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::eval::{Eval, Issue, IssueSeverity};
use quillforge_core::ids::EvalId;
use quillforge_core::traits::agent::{Agent, AgentContext};
use quillforge_providers::json_completion::generate_json;
use quillforge_utils::prohibited_patterns;
use serde_json::json;
use std::collections::HashSet;

const MAX_RETRIES: u32 = 2;
const PASSING_SCORE: u8 = 70;

pub struct QaAgent;

impl QaAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn build_prompt(input: &QaInput) -> String {
        format!(
            "Evaluate this article targeting the keyword \"{}\" on readability, SEO, accuracy, engagement, and brand voice. \
             Score each dimension 0-100 and list any issues you find with a category, severity, description, and suggestion.\n\n\
             Title: {}\nMeta title: {}\nMeta description: {}\n\nArticle:\n{}",
            input.keyword,
            input.article.title,
            input.seo_data.meta_title,
            input.seo_data.meta_description,
            input.article.content,
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["passed", "overallScore", "dimensionScores", "issues", "feedback"],
            "properties": {
                "overallScore": {"type": "integer", "minimum": 0, "maximum": 100}
            }
        })
    }

    /// `passed` requires a passing mean score and zero critical issues (§4.3 QA Agent).
    fn compute_passed(score: u8, issues: &[Issue]) -> bool {
        score >= PASSING_SCORE && !issues.iter().any(|i| i.severity == IssueSeverity::Critical)
    }

    /// Penalty subtracted from the raw dimension mean for detected prohibited
    /// patterns and critical issues (§4.3: the score itself must reflect
    /// these, not just the `passed` gate).
    fn score_penalty(issues: &[Issue]) -> f64 {
        issues
            .iter()
            .map(|issue| match issue.severity {
                IssueSeverity::Critical => 20.0,
                IssueSeverity::High => 10.0,
                IssueSeverity::Medium => 5.0,
                IssueSeverity::Low => 0.0,
            })
            .sum()
    }

    /// Diffs the current issue set against the prior iteration's, bumping
    /// `persist_count` on findings that survived and classifying fixed vs. persisting ids.
    fn diff_against_previous(
        current: &mut [Issue],
        previous: Option<&[Issue]>,
    ) -> (Vec<String>, Vec<String>) {
        let Some(previous) = previous else {
            return (Vec::new(), Vec::new());
        };
        let current_ids: HashSet<&str> = current.iter().map(|i| i.issue_id.as_str()).collect();
        let fixed: Vec<String> = previous
            .iter()
            .filter(|p| !current_ids.contains(p.issue_id.as_str()))
            .map(|p| p.issue_id.clone())
            .collect();

        let mut persisting = Vec::new();
        for issue in current.iter_mut() {
            if let Some(prior) = previous.iter().find(|p| p.issue_id == issue.issue_id) {
                issue.persist_count = prior.persist_count + 1;
                persisting.push(issue.issue_id.clone());
            }
        }
        (fixed, persisting)
    }
}

impl Default for QaAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for QaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Qa
    }

    fn name(&self) -> &str {
        "qa"
    }

    fn description(&self) -> &str {
        "Scores the drafted article across five dimensions and surfaces fixable issues"
    }

    async fn validate_input(&self, input: &AgentRequest) -> Result<()> {
        match input {
            AgentRequest::Qa(qa) if qa.article.content.trim().is_empty() => {
                Err(PipelineError::validation_field("article content must not be empty", "article"))
            }
            AgentRequest::Qa(_) => Ok(()),
            _ => Err(PipelineError::validation("qa agent received a non-qa input")),
        }
    }

    fn output_schema(&self) -> serde_json::Value {
        Self::output_schema()
    }

    async fn execute(&self, input: AgentRequest, ctx: AgentContext) -> Result<AgentOutcome> {
        let AgentRequest::Qa(qa_input) = input else {
            return Err(PipelineError::validation("qa agent received a non-qa input"));
        };

        let prompt = Self::build_prompt(&qa_input);
        let schema = Self::output_schema();

        let completion = generate_json(
            ctx.provider.as_ref(),
            &prompt,
            Some(&ctx.persona.system_prompt),
            &ctx.persona.model,
            &schema,
            MAX_RETRIES,
        )
        .await?;

        let mut output: QaOutput = serde_json::from_value(completion.value)
            .map_err(|e| PipelineError::internal(format!("qa output did not match QaOutput: {e}")))?;

        let mut pattern_issues = prohibited_patterns::scan(&qa_input.article.content);
        output.issues.append(&mut pattern_issues);

        let penalty = Self::score_penalty(&output.issues);
        output.overall_score = (output.dimension_scores.mean() - penalty).round().clamp(0.0, 100.0) as u8;
        output.passed = Self::compute_passed(output.overall_score, &output.issues);

        let previous = qa_input.previous_issues.as_deref();
        let (fixed, persisting) = Self::diff_against_previous(&mut output.issues, previous);
        output.fixed_issue_ids = if fixed.is_empty() { None } else { Some(fixed) };
        output.persisting_issue_ids = if persisting.is_empty() { None } else { Some(persisting) };

        if let Some(step_id) = ctx.step_id {
            let eval = Eval {
                id: EvalId::new(),
                step_id,
                iteration: qa_input.iteration,
                overall_score: output.overall_score,
                dimension_scores: output.dimension_scores,
                passed: output.passed,
                issues: output.issues.clone(),
                feedback: output.feedback.clone(),
            };
            ctx.repository.insert_eval(eval).await?;
        }

        Ok(AgentOutcome::success(
            AgentResponse::Qa(output),
            completion.usage,
            completion.cost_usd,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_with_high_score_and_no_critical_issues() {
        let issues = vec![Issue::new("readability", IssueSeverity::Low, "minor", "tweak")];
        assert!(QaAgent::compute_passed(85, &issues));
    }

    #[test]
    fn fails_with_a_critical_issue_even_at_high_score() {
        let issues = vec![Issue::new("accuracy", IssueSeverity::Critical, "wrong fact", "fix it")];
        assert!(!QaAgent::compute_passed(95, &issues));
    }

    #[test]
    fn fails_below_passing_score() {
        assert!(!QaAgent::compute_passed(50, &[]));
    }

    #[test]
    fn score_penalty_accumulates_by_severity() {
        let issues = vec![
            Issue::new("tone", IssueSeverity::Critical, "banned phrase", "remove it"),
            Issue::new("tone", IssueSeverity::Medium, "em dash", "rephrase"),
        ];
        assert!((QaAgent::score_penalty(&issues) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_penalty_is_zero_with_no_issues() {
        assert_eq!(QaAgent::score_penalty(&[]), 0.0);
    }

    #[test]
    fn diff_marks_resolved_issues_as_fixed() {
        let previous = vec![Issue::new("readability", IssueSeverity::Medium, "long sentences", "shorten")];
        let mut current: Vec<Issue> = Vec::new();
        let (fixed, persisting) = QaAgent::diff_against_previous(&mut current, Some(&previous));
        assert_eq!(fixed.len(), 1);
        assert!(persisting.is_empty());
    }

    #[test]
    fn diff_bumps_persist_count_for_surviving_issues() {
        let previous = vec![Issue::new("readability", IssueSeverity::Medium, "long sentences", "shorten")];
        let mut current = vec![Issue::new("readability", IssueSeverity::Medium, "long sentences", "shorten")];
        let (fixed, persisting) = QaAgent::diff_against_previous(&mut current, Some(&previous));
        assert!(fixed.is_empty());
        assert_eq!(persisting.len(), 1);
        assert_eq!(current[0].persist_count, 2);
    }
}
