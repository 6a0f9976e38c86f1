//! ABOUTME: Canned ResearchSource double — returns a fixed RawResearch payload, no network calls

use async_trait::async_trait;
use parking_lot::RwLock;
use quillforge_core::agent_io::{Competitor, KeywordData};
use quillforge_core::error::Result;
use quillforge_core::traits::research::{RawResearch, ResearchDepth, ResearchSource};

pub struct MockResearchSource {
    response: RwLock<RawResearch>,
}

impl MockResearchSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: RwLock::new(default_response()),
        }
    }

    pub fn set_response(&self, response: RawResearch) {
        *self.response.write() = response;
    }
}

impl Default for MockResearchSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResearchSource for MockResearchSource {
    async fn perform_research(&self, keyword: &str, _depth: ResearchDepth) -> Result<RawResearch> {
        let mut research = self.response.read().clone();
        research.keyword = keyword.to_string();
        Ok(research)
    }
}

fn default_response() -> RawResearch {
    RawResearch {
        keyword: String::new(),
        keyword_data: KeywordData::default(),
        serp_results: Vec::new(),
        paa_questions: vec!["What is the best choice for beginners?".to_string()],
        related_keywords: vec!["buying guide".to_string()],
        keyword_suggestions: Vec::new(),
        competitors: vec![Competitor {
            url: "https://example.com/a".to_string(),
            title: "A Buying Guide".to_string(),
            word_count: Some(1800),
            headings: Some(vec!["Introduction".to_string(), "Top Picks".to_string()]),
        }],
        total_cost: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_requested_keyword() {
        let source = MockResearchSource::new();
        let research = source.perform_research("trail shoes", ResearchDepth::default()).await.unwrap();
        assert_eq!(research.keyword, "trail shoes");
        assert!(!research.competitors.is_empty());
    }
}
