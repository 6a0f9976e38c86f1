//! ABOUTME: Research Agent (§4.3) — no LLM call, zero token usage
//! ABOUTME: Wraps the Research Data Source and derives a word-count recommendation and content gaps

use async_trait::async_trait;
use quillforge_core::agent_io::{AgentOutcome, AgentRequest, AgentResponse, ResearchOutput, TokenUsage};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::agent::{Agent, AgentContext};
use quillforge_core::traits::research::ResearchDepth;
use serde_json::json;

const MIN_WORD_COUNT: u32 = 300;
const MAX_WORD_COUNT: u32 = 5000;
const DEFAULT_WORD_COUNT: u32 = 1500;
const MAX_COMPETITORS: usize = 10;

pub struct ResearchAgent;

impl ResearchAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn recommend_word_count(target_word_count: Option<u32>, competitor_word_counts: &[u32]) -> u32 {
        let raw = match target_word_count {
            Some(target) if target > 0 => target,
            _ => {
                if competitor_word_counts.is_empty() {
                    DEFAULT_WORD_COUNT
                } else {
                    let sum: u64 = competitor_word_counts.iter().map(|&w| u64::from(w)).sum();
                    u32::try_from(sum / competitor_word_counts.len() as u64).unwrap_or(DEFAULT_WORD_COUNT)
                }
            }
        };
        raw.clamp(MIN_WORD_COUNT, MAX_WORD_COUNT)
    }

    /// PAA questions not addressed by any competitor heading (case-insensitive substring match).
    fn content_gaps(paa_questions: &[String], competitor_headings: &[String]) -> Vec<String> {
        let lowered_headings: Vec<String> = competitor_headings.iter().map(|h| h.to_lowercase()).collect();
        paa_questions
            .iter()
            .filter(|q| {
                let lowered_q = q.to_lowercase();
                !lowered_headings.iter().any(|h| h.contains(&lowered_q) || lowered_q.contains(h.as_str()))
            })
            .cloned()
            .collect()
    }
}

impl Default for ResearchAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Research
    }

    fn name(&self) -> &str {
        "research"
    }

    fn description(&self) -> &str {
        "Aggregates keyword, SERP, and competitor data and recommends a target word count"
    }

    async fn validate_input(&self, input: &AgentRequest) -> Result<()> {
        match input {
            AgentRequest::Research(research) if research.keyword.trim().is_empty() => {
                Err(PipelineError::validation_field("keyword must not be empty", "keyword"))
            }
            AgentRequest::Research(_) => Ok(()),
            _ => Err(PipelineError::validation("research agent received a non-research input")),
        }
    }

    fn output_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["keyword", "keywordData", "competitors", "relatedKeywords", "paaQuestions", "recommendedWordCount"],
            "properties": {
                "recommendedWordCount": {"type": "integer", "minimum": 300, "maximum": 10000}
            }
        })
    }

    async fn execute(&self, input: AgentRequest, ctx: AgentContext) -> Result<AgentOutcome> {
        let AgentRequest::Research(research_input) = input else {
            return Ok(AgentOutcome::failure(
                "research agent received a non-research input",
                TokenUsage::default(),
            ));
        };

        let depth = ResearchDepth {
            serp_depth: 10,
            related_limit: 20,
            suggestions_limit: 10,
        };

        let raw = ctx
            .research_source
            .perform_research(&research_input.keyword, depth)
            .await?;

        let competitors: Vec<_> = raw.competitors.into_iter().take(MAX_COMPETITORS).collect();
        let competitor_word_counts: Vec<u32> = competitors.iter().filter_map(|c| c.word_count).collect();
        let competitor_headings: Vec<String> = competitors
            .iter()
            .filter_map(|c| c.headings.clone())
            .flatten()
            .collect();

        let recommended_word_count =
            Self::recommend_word_count(research_input.target_word_count, &competitor_word_counts);
        let content_gaps = Self::content_gaps(&raw.paa_questions, &competitor_headings);

        let output = ResearchOutput {
            keyword: raw.keyword,
            keyword_data: raw.keyword_data,
            competitors,
            related_keywords: raw.related_keywords,
            paa_questions: raw.paa_questions,
            recommended_word_count,
            content_gaps: if content_gaps.is_empty() { None } else { Some(content_gaps) },
        };

        Ok(AgentOutcome::success(
            AgentResponse::Research(output),
            TokenUsage::default(),
            raw.total_cost,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommend_word_count_passes_through_explicit_target() {
        assert_eq!(ResearchAgent::recommend_word_count(Some(2000), &[500, 600]), 2000);
    }

    #[test]
    fn recommend_word_count_averages_competitors_when_no_target() {
        assert_eq!(ResearchAgent::recommend_word_count(None, &[1000, 2000]), 1500);
    }

    #[test]
    fn recommend_word_count_clamps_to_bounds() {
        assert_eq!(ResearchAgent::recommend_word_count(Some(50), &[]), MIN_WORD_COUNT);
        assert_eq!(ResearchAgent::recommend_word_count(Some(9000), &[]), MAX_WORD_COUNT);
    }

    #[test]
    fn recommend_word_count_falls_back_to_default_with_no_signal() {
        assert_eq!(ResearchAgent::recommend_word_count(None, &[]), DEFAULT_WORD_COUNT);
    }

    #[test]
    fn content_gaps_excludes_questions_covered_by_headings() {
        let paa = vec!["how much does a driveway cost".to_string(), "what is the best material".to_string()];
        let headings = vec!["How Much Does a Driveway Cost".to_string()];
        let gaps = ResearchAgent::content_gaps(&paa, &headings);
        assert_eq!(gaps, vec!["what is the best material".to_string()]);
    }
}
