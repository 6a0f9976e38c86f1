//! ABOUTME: Project Manager Agent (§4.3) — deterministic assembly of the final
//! ABOUTME: publish-ready article, zero LLM calls and zero token usage

use async_trait::async_trait;
use quillforge_core::agent_io::{
    AgentOutcome, AgentRequest, AgentResponse, FinalArticle, PmInput, ProjectManagerOutput, PublishStatus, TokenUsage,
};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::agent::{Agent, AgentContext};
use serde_json::json;

pub struct ProjectManagerAgent;

impl ProjectManagerAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The four checks named in §4.3 — no more, no less. QA is only checked
    /// when `qaData` is present (§8's Open Question: a skipped QA does not
    /// itself produce a validation error).
    fn validate(input: &PmInput) -> Vec<String> {
        let mut errors = Vec::new();
        if input.article.title.trim().is_empty() {
            errors.push("missing title".to_string());
        }
        if input.article.content.trim().is_empty() {
            errors.push("missing content".to_string());
        }
        if input.article.word_count < 300 {
            errors.push("too short".to_string());
        }
        if let Some(qa) = &input.qa_data {
            if !qa.passed {
                errors.push("QA check failed".to_string());
            }
        }

        errors
    }

    fn summary(input: &PmInput, ready: bool) -> String {
        let qa_score = input.qa_data.as_ref().map_or_else(|| "n/a".to_string(), |qa| qa.overall_score.to_string());
        format!(
            "\"{}\" ({} words, QA score {qa_score}) is {}.",
            input.article.title,
            input.article.word_count,
            if ready { "ready to publish" } else { "not ready to publish" }
        )
    }

    /// The four triggers named in §4.3, each independent of the others.
    fn recommendations(input: &PmInput) -> Option<Vec<String>> {
        let mut recommendations = Vec::new();
        if let Some(seo) = &input.seo_data {
            if seo.optimization_score < 70 {
                recommendations.push("Improve SEO".to_string());
            }
            if seo.internal_links.as_ref().is_none_or(Vec::is_empty) {
                recommendations.push("consider internal links".to_string());
            }
        }
        if let Some(qa) = &input.qa_data {
            if !qa.passed {
                recommendations.push("address QA feedback".to_string());
            }
        }
        if input.article.word_count < 500 {
            recommendations.push("consider expanding".to_string());
        }
        if recommendations.is_empty() {
            None
        } else {
            Some(recommendations)
        }
    }
}

impl Default for ProjectManagerAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ProjectManagerAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::ProjectManager
    }

    fn name(&self) -> &str {
        "project_manager"
    }

    fn description(&self) -> &str {
        "Assembles the final publish-ready article record; no LLM call"
    }

    async fn validate_input(&self, input: &AgentRequest) -> Result<()> {
        match input {
            AgentRequest::ProjectManager(_) => Ok(()),
            _ => Err(PipelineError::validation("project manager agent received a non-pm input")),
        }
    }

    fn output_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["readyForPublish", "validationErrors", "finalArticle", "summary"]
        })
    }

    async fn execute(&self, input: AgentRequest, _ctx: AgentContext) -> Result<AgentOutcome> {
        let AgentRequest::ProjectManager(pm_input) = input else {
            return Err(PipelineError::validation("project manager agent received a non-pm input"));
        };

        let validation_errors = Self::validate(&pm_input);
        let ready_for_publish = validation_errors.is_empty();
        let status = if ready_for_publish && pm_input.settings.auto_post {
            PublishStatus::Published
        } else {
            PublishStatus::Draft
        };

        let (meta_title, meta_description, schema_markup) = match &pm_input.seo_data {
            Some(seo) => (seo.meta_title.clone(), seo.meta_description.clone(), seo.schema_markup.clone()),
            None => (pm_input.article.title.clone(), pm_input.article.excerpt.clone(), serde_json::Value::Null),
        };

        let summary = Self::summary(&pm_input, ready_for_publish);
        let recommendations = Self::recommendations(&pm_input);

        let final_article = FinalArticle {
            title: pm_input.article.title.clone(),
            slug: pm_input.article.slug.clone(),
            content: pm_input.article.content.clone(),
            excerpt: pm_input.article.excerpt.clone(),
            meta_title,
            meta_description,
            schema_markup,
            template: pm_input.settings.template.clone(),
            status,
            focus_keyword: Some(pm_input.keyword.clone()),
            word_count: pm_input.article.word_count,
        };

        let output = ProjectManagerOutput {
            ready_for_publish,
            validation_errors,
            final_article,
            summary,
            recommendations,
        };

        Ok(AgentOutcome::success(AgentResponse::ProjectManager(output), TokenUsage::default(), 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillforge_core::agent_io::{Heading, KeywordDensity, HeadingAnalysis, SeoOutput, WriterOutput};
    use quillforge_core::eval::DimensionScores;
    use quillforge_core::job::JobSettings;

    fn article() -> WriterOutput {
        WriterOutput {
            title: "Driveway Sealing 101".into(),
            slug: "driveway-sealing-101".into(),
            content: "Some article body.".into(),
            excerpt: "A short excerpt.".into(),
            word_count: 1500,
            headings: vec![Heading { level: 2, text: "Intro".into() }],
        }
    }

    fn seo() -> SeoOutput {
        SeoOutput {
            meta_title: "Driveway Sealing Guide".into(),
            meta_description: "Everything about sealing your driveway.".into(),
            heading_analysis: HeadingAnalysis { is_valid: true, issues: vec![], suggestions: vec![] },
            keyword_density: KeywordDensity { percentage: 1.2, analysis: "good".into() },
            schema_markup: serde_json::json!({}),
            internal_links: None,
            optimization_score: 88,
        }
    }

    #[test]
    fn missing_seo_data_does_not_block_readiness() {
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: article(),
            seo_data: None,
            qa_data: None,
            settings: JobSettings::default(),
        };
        assert!(ProjectManagerAgent::validate(&input).is_empty());
    }

    #[test]
    fn missing_title_is_a_validation_error() {
        let mut missing_title = article();
        missing_title.title = String::new();
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: missing_title,
            seo_data: Some(seo()),
            qa_data: None,
            settings: JobSettings::default(),
        };
        let errors = ProjectManagerAgent::validate(&input);
        assert!(errors.contains(&"missing title".to_string()));
    }

    #[test]
    fn short_article_is_too_short() {
        let mut short = article();
        short.word_count = 250;
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: short,
            seo_data: Some(seo()),
            qa_data: None,
            settings: JobSettings::default(),
        };
        let errors = ProjectManagerAgent::validate(&input);
        assert!(errors.contains(&"too short".to_string()));
    }

    #[test]
    fn failing_qa_blocks_readiness() {
        let qa = quillforge_core::agent_io::QaOutput {
            passed: false,
            overall_score: 40,
            dimension_scores: DimensionScores { readability: 40, seo: 40, accuracy: 40, engagement: 40, brand_voice: 40 },
            issues: vec![],
            feedback: "needs work".into(),
            fixed_issue_ids: None,
            persisting_issue_ids: None,
        };
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: article(),
            seo_data: Some(seo()),
            qa_data: Some(qa),
            settings: JobSettings::default(),
        };
        let errors = ProjectManagerAgent::validate(&input);
        assert!(errors.contains(&"QA check failed".to_string()));
    }

    #[test]
    fn missing_qa_data_does_not_add_a_validation_error() {
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: article(),
            seo_data: Some(seo()),
            qa_data: None,
            settings: JobSettings::default(),
        };
        assert!(ProjectManagerAgent::validate(&input).is_empty());
    }

    #[test]
    fn recommendations_cover_all_four_triggers() {
        let qa = quillforge_core::agent_io::QaOutput {
            passed: false,
            overall_score: 40,
            dimension_scores: DimensionScores { readability: 40, seo: 40, accuracy: 40, engagement: 40, brand_voice: 40 },
            issues: vec![],
            feedback: "needs work".into(),
            fixed_issue_ids: None,
            persisting_issue_ids: None,
        };
        let mut low_seo = seo();
        low_seo.optimization_score = 50;
        low_seo.internal_links = None;
        let mut short = article();
        short.word_count = 400;
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: short,
            seo_data: Some(low_seo),
            qa_data: Some(qa),
            settings: JobSettings::default(),
        };
        let recommendations = ProjectManagerAgent::recommendations(&input).unwrap();
        assert!(recommendations.contains(&"Improve SEO".to_string()));
        assert!(recommendations.contains(&"consider internal links".to_string()));
        assert!(recommendations.contains(&"address QA feedback".to_string()));
        assert!(recommendations.contains(&"consider expanding".to_string()));
    }

    #[test]
    fn recommendations_none_when_everything_is_healthy() {
        let qa = quillforge_core::agent_io::QaOutput {
            passed: true,
            overall_score: 90,
            dimension_scores: DimensionScores { readability: 90, seo: 90, accuracy: 90, engagement: 90, brand_voice: 90 },
            issues: vec![],
            feedback: "great".into(),
            fixed_issue_ids: None,
            persisting_issue_ids: None,
        };
        let mut good_seo = seo();
        good_seo.internal_links = Some(vec![quillforge_core::agent_io::InternalLink {
            anchor_text: "driveway cost".into(),
            suggested_path: "/driveway-cost".into(),
            reason: "related".into(),
        }]);
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: article(),
            seo_data: Some(good_seo),
            qa_data: Some(qa),
            settings: JobSettings::default(),
        };
        assert!(ProjectManagerAgent::recommendations(&input).is_none());
    }

    #[test]
    fn complete_and_passing_input_is_ready_with_no_errors() {
        let qa = quillforge_core::agent_io::QaOutput {
            passed: true,
            overall_score: 90,
            dimension_scores: DimensionScores { readability: 90, seo: 90, accuracy: 90, engagement: 90, brand_voice: 90 },
            issues: vec![],
            feedback: "great".into(),
            fixed_issue_ids: None,
            persisting_issue_ids: None,
        };
        let input = PmInput {
            keyword: "driveway sealing".into(),
            article: article(),
            seo_data: Some(seo()),
            qa_data: Some(qa),
            settings: JobSettings::default(),
        };
        assert!(ProjectManagerAgent::validate(&input).is_empty());
    }
}
