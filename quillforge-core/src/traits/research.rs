//! ABOUTME: Research Data Source capability (§4.2) — the seam `quillforge-research` implements

use crate::agent_io::{Competitor, KeywordData};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct ResearchDepth {
    pub serp_depth: u32,
    pub related_limit: u32,
    pub suggestions_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpResult {
    pub url: String,
    pub title: String,
    pub position: u32,
}

/// Output of `performResearch` (§4.2), the composite call the Research Agent
/// consumes — distinct from `ResearchOutput`, which is the *agent's* published
/// shape after it has applied the word-count and content-gap logic of §4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResearch {
    pub keyword: String,
    pub keyword_data: KeywordData,
    pub serp_results: Vec<SerpResult>,
    pub paa_questions: Vec<String>,
    pub related_keywords: Vec<String>,
    pub keyword_suggestions: Vec<String>,
    pub competitors: Vec<Competitor>,
    pub total_cost: f64,
}

/// External API wrapper for keyword/SERP/related-term research (§4.2).
#[async_trait]
pub trait ResearchSource: Send + Sync {
    async fn perform_research(
        &self,
        keyword: &str,
        depth: ResearchDepth,
    ) -> crate::error::Result<RawResearch>;
}
