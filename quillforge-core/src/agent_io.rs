//! ABOUTME: Field-exact agent input/output shapes (§6.3) plus the uniform
//! ABOUTME: AgentRequest/AgentResponse/AgentOutcome envelope agents exchange with the orchestrator

use crate::agent_type::AgentType;
use crate::eval::Issue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Token usage for a single agent invocation. Always reported, even on failure
/// (§4.3 "Usage is always reported, even on failure").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    #[must_use]
    pub const fn total(self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchInput {
    pub keyword: String,
    pub context: Option<String>,
    pub target_word_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordData {
    pub search_volume: Option<u64>,
    pub difficulty: Option<f32>,
    pub intent: Option<String>,
    pub cpc: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub url: String,
    pub title: String,
    pub word_count: Option<u32>,
    pub headings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOutput {
    pub keyword: String,
    pub keyword_data: KeywordData,
    /// At most 10 (§6.3).
    pub competitors: Vec<Competitor>,
    pub related_keywords: Vec<String>,
    pub paa_questions: Vec<String>,
    /// Clamped to `[300, 10000]` at the wire boundary (§6.3); the agent itself
    /// clamps its *computed* recommendation to the tighter `[300, 5000]` (§4.3).
    pub recommended_word_count: u32,
    pub content_gaps: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterInput {
    pub keyword: String,
    pub research_data: ResearchOutput,
    pub target_word_count: u32,
    pub qa_feedback: Option<String>,
    pub issues_to_fix: Option<Vec<Issue>>,
    pub previous_article: Option<String>,
    pub iteration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    /// `2..=4` (§6.3).
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterOutput {
    /// `<= 60` chars (§6.3).
    pub title: String,
    pub slug: String,
    pub content: String,
    /// `<= 160` chars (§6.3).
    pub excerpt: String,
    pub word_count: u32,
    pub headings: Vec<Heading>,
}

// ---------------------------------------------------------------------------
// SEO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoInput {
    pub keyword: String,
    pub article: WriterOutput,
    pub research_data: ResearchOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingAnalysis {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDensity {
    pub percentage: f32,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalLink {
    pub anchor_text: String,
    pub suggested_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoOutput {
    /// `<= 60` chars (§6.3).
    pub meta_title: String,
    /// `<= 160` chars (§6.3).
    pub meta_description: String,
    pub heading_analysis: HeadingAnalysis,
    pub keyword_density: KeywordDensity,
    pub schema_markup: serde_json::Value,
    pub internal_links: Option<Vec<InternalLink>>,
    /// `[0, 100]` (§6.3).
    pub optimization_score: u8,
}

// ---------------------------------------------------------------------------
// QA
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaInput {
    pub keyword: String,
    pub article: WriterOutput,
    pub seo_data: SeoOutput,
    pub iteration: u32,
    pub previous_issues: Option<Vec<Issue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaOutput {
    pub passed: bool,
    /// `[0, 100]` (§6.3).
    pub overall_score: u8,
    pub dimension_scores: crate::eval::DimensionScores,
    pub issues: Vec<Issue>,
    pub feedback: String,
    pub fixed_issue_ids: Option<Vec<String>>,
    pub persisting_issue_ids: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Project Manager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmInput {
    pub keyword: String,
    pub article: WriterOutput,
    pub seo_data: Option<SeoOutput>,
    pub qa_data: Option<QaOutput>,
    pub settings: crate::job::JobSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub meta_title: String,
    pub meta_description: String,
    pub schema_markup: serde_json::Value,
    pub template: String,
    pub status: PublishStatus,
    pub focus_keyword: Option<String>,
    pub word_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManagerOutput {
    pub ready_for_publish: bool,
    pub validation_errors: Vec<String>,
    pub final_article: FinalArticle,
    pub summary: String,
    pub recommendations: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Uniform envelope (§4.3 "All agents implement a uniform interface")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "agent_type", rename_all = "snake_case")]
pub enum AgentRequest {
    Research(ResearchInput),
    Writer(WriterInput),
    Seo(SeoInput),
    Qa(QaInput),
    ProjectManager(PmInput),
}

impl AgentRequest {
    #[must_use]
    pub const fn agent_type(&self) -> AgentType {
        match self {
            Self::Research(_) => AgentType::Research,
            Self::Writer(_) => AgentType::Writer,
            Self::Seo(_) => AgentType::Seo,
            Self::Qa(_) => AgentType::Qa,
            Self::ProjectManager(_) => AgentType::ProjectManager,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "agent_type", rename_all = "snake_case")]
pub enum AgentResponse {
    Research(ResearchOutput),
    Writer(WriterOutput),
    Seo(SeoOutput),
    Qa(QaOutput),
    ProjectManager(ProjectManagerOutput),
}

/// Outcome of one `Agent::execute` call (§4.3 uniform interface).
///
/// `success = true` implies `output.is_some()`; usage is populated regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub success: bool,
    pub output: Option<AgentResponse>,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub continue_to_next: bool,
    pub error: Option<String>,
    pub feedback: Option<String>,
}

impl AgentOutcome {
    #[must_use]
    pub fn success(output: AgentResponse, usage: TokenUsage, cost_usd: f64) -> Self {
        Self {
            success: true,
            output: Some(output),
            usage,
            cost_usd,
            continue_to_next: true,
            error: None,
            feedback: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            success: false,
            output: None,
            usage,
            cost_usd: 0.0,
            continue_to_next: false,
            error: Some(error.into()),
            feedback: None,
        }
    }
}

/// Fixed `skipAgents` superset used for the "every agent skipped" boundary check (§8).
#[must_use]
pub fn all_agent_types() -> HashSet<AgentType> {
    AgentType::ALL.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_output_serializes_camel_case() {
        let output = ResearchOutput {
            keyword: "shoes".to_string(),
            keyword_data: KeywordData::default(),
            competitors: vec![],
            related_keywords: vec![],
            paa_questions: vec![],
            recommended_word_count: 1200,
            content_gaps: None,
        };
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("recommendedWordCount").is_some());
        assert!(json.get("recommended_word_count").is_none());
    }

    #[test]
    fn writer_output_round_trips_through_camel_case_json() {
        let json = serde_json::json!({
            "title": "Best Trail Shoes",
            "slug": "best-trail-shoes",
            "content": "...",
            "excerpt": "short",
            "wordCount": 1500,
            "headings": [{"level": 2, "text": "Intro"}],
        });
        let output: WriterOutput = serde_json::from_value(json).unwrap();
        assert_eq!(output.word_count, 1500);
        assert_eq!(output.headings[0].level, 2);
    }

    #[test]
    fn agent_request_tags_on_agent_type_in_snake_case() {
        let request = AgentRequest::Research(ResearchInput {
            keyword: "shoes".to_string(),
            context: None,
            target_word_count: None,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["agent_type"], "research");
        assert_eq!(request.agent_type(), AgentType::Research);
    }

    #[test]
    fn all_agent_types_covers_every_variant() {
        assert_eq!(all_agent_types().len(), AgentType::ALL.len());
    }
}
