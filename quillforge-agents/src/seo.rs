//! ABOUTME: SEO Agent (§4.3) — deterministic metrics (meta-field limits, heading
//! ABOUTME: structure, keyword density) layered over an LLM call for qualitative judgment

use async_trait::async_trait;
use quillforge_core::agent_io::{AgentOutcome, AgentRequest, AgentResponse, Heading, SeoInput, SeoOutput};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::agent::{Agent, AgentContext};
use quillforge_providers::json_completion::generate_json;
use serde_json::json;

const MAX_RETRIES: u32 = 2;
const META_TITLE_MAX: usize = 60;
const META_DESCRIPTION_MAX: usize = 160;

pub struct SeoAgent;

impl SeoAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn build_prompt(input: &SeoInput) -> String {
        format!(
            "Generate SEO metadata for an article targeting the keyword \"{}\".\n\nTitle: {}\nExcerpt: {}\nHeadings: {}\n\nProduce a meta title (<= {META_TITLE_MAX} chars), a meta description (<= {META_DESCRIPTION_MAX} chars), \
             Article.org/Schema.org markup as JSON, and internal link suggestions if you can infer related pages from the related keywords: {}.",
            input.keyword,
            input.article.title,
            input.article.excerpt,
            input.article.headings.iter().map(|h| format!("H{}: {}", h.level, h.text)).collect::<Vec<_>>().join("; "),
            input.research_data.related_keywords.join(", "),
        )
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["metaTitle", "metaDescription", "headingAnalysis", "keywordDensity", "schemaMarkup", "optimizationScore"],
            "properties": {
                "optimizationScore": {"type": "integer", "minimum": 0, "maximum": 100}
            }
        })
    }

    /// Checks that headings start at H2 and never skip a level on the way down.
    fn analyze_heading_structure(headings: &[Heading]) -> (bool, Vec<String>) {
        let mut issues = Vec::new();
        if headings.is_empty() {
            issues.push("article has no headings".to_string());
            return (false, issues);
        }
        if headings[0].level != 2 {
            issues.push(format!("first heading is H{} instead of H2", headings[0].level));
        }
        let mut prev_level = headings[0].level;
        for heading in &headings[1..] {
            if heading.level > prev_level + 1 {
                issues.push(format!(
                    "heading \"{}\" jumps from H{prev_level} to H{}, skipping a level",
                    heading.text, heading.level
                ));
            }
            prev_level = heading.level;
        }
        (issues.is_empty(), issues)
    }

    /// Occurrences of the keyword (case-insensitive, whole-word) over total word count.
    fn keyword_density(content: &str, keyword: &str) -> f32 {
        let words: Vec<&str> = content.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }
        let keyword_lower = keyword.to_lowercase();
        let content_lower = content.to_lowercase();
        let occurrences = content_lower.matches(&keyword_lower).count();
        (occurrences as f32 / words.len() as f32) * 100.0
    }
}

impl Default for SeoAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for SeoAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Seo
    }

    fn name(&self) -> &str {
        "seo"
    }

    fn description(&self) -> &str {
        "Produces meta fields, schema markup, and keyword/heading analysis for the drafted article"
    }

    async fn validate_input(&self, input: &AgentRequest) -> Result<()> {
        match input {
            AgentRequest::Seo(seo) if seo.article.content.trim().is_empty() => {
                Err(PipelineError::validation_field("article content must not be empty", "article"))
            }
            AgentRequest::Seo(_) => Ok(()),
            _ => Err(PipelineError::validation("seo agent received a non-seo input")),
        }
    }

    fn output_schema(&self) -> serde_json::Value {
        Self::output_schema()
    }

    async fn execute(&self, input: AgentRequest, ctx: AgentContext) -> Result<AgentOutcome> {
        let AgentRequest::Seo(seo_input) = input else {
            return Err(PipelineError::validation("seo agent received a non-seo input"));
        };

        let prompt = Self::build_prompt(&seo_input);
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

        let mut output: SeoOutput = serde_json::from_value(completion.value)
            .map_err(|e| PipelineError::internal(format!("seo output did not match SeoOutput: {e}")))?;

        if output.meta_title.chars().count() > META_TITLE_MAX {
            output.meta_title = output.meta_title.chars().take(META_TITLE_MAX).collect();
        }
        if output.meta_description.chars().count() > META_DESCRIPTION_MAX {
            output.meta_description = output.meta_description.chars().take(META_DESCRIPTION_MAX).collect();
        }

        let (structurally_valid, mut structural_issues) = Self::analyze_heading_structure(&seo_input.article.headings);
        output.heading_analysis.is_valid = output.heading_analysis.is_valid && structurally_valid;
        output.heading_analysis.issues.append(&mut structural_issues);

        output.keyword_density.percentage = Self::keyword_density(&seo_input.article.content, &seo_input.keyword);

        Ok(AgentOutcome::success(
            AgentResponse::Seo(output),
            completion.usage,
            completion.cost_usd,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_heading_structure_has_no_issues() {
        let headings = vec![
            Heading { level: 2, text: "Intro".into() },
            Heading { level: 3, text: "Sub".into() },
            Heading { level: 2, text: "Next".into() },
        ];
        let (valid, issues) = SeoAgent::analyze_heading_structure(&headings);
        assert!(valid);
        assert!(issues.is_empty());
    }

    #[test]
    fn skipped_level_is_flagged() {
        let headings = vec![Heading { level: 2, text: "Intro".into() }, Heading { level: 4, text: "Deep".into() }];
        let (valid, issues) = SeoAgent::analyze_heading_structure(&headings);
        assert!(!valid);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn missing_h2_start_is_flagged() {
        let headings = vec![Heading { level: 3, text: "Intro".into() }];
        let (valid, _) = SeoAgent::analyze_heading_structure(&headings);
        assert!(!valid);
    }

    #[test]
    fn keyword_density_counts_case_insensitively() {
        let content = "Driveway Sealing is great. driveway sealing lasts years.";
        let density = SeoAgent::keyword_density(content, "driveway sealing");
        assert!(density > 0.0);
    }

    #[test]
    fn empty_content_has_zero_density() {
        assert_eq!(SeoAgent::keyword_density("", "anything"), 0.0);
    }
}
