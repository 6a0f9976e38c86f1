//! ABOUTME: HTTP-backed `ResearchSource` aggregating keyword/SERP/related-term lookups (§4.2)
//! ABOUTME: Wire format and auth for the upstream API are out of scope; this assumes one JSON API

use async_trait::async_trait;
use quillforge_core::agent_io::{Competitor, KeywordData};
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::research::{RawResearch, ResearchDepth, ResearchSource, SerpResult};
use serde::Deserialize;
use std::time::Duration;

pub struct HttpResearchSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpResearchSource {
    /// # Panics
    /// Panics if the HTTP client cannot be constructed.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamTransient {
                message: format!("research source request to {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PipelineError::Auth {
                message: "research source rejected credentials".into(),
            });
        }
        if response.status().is_server_error() || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PipelineError::UpstreamTransient {
                message: format!("research source returned {}", response.status()),
                source: None,
            });
        }
        if response.status().is_client_error() {
            return Err(PipelineError::UpstreamPermanent {
                message: format!("research source rejected request: {}", response.status()),
            });
        }

        response.json::<T>().await.map_err(|e| PipelineError::Provider {
            message: format!("malformed research source response at {path}: {e}"),
            provider: Some("research-source".into()),
            source: Some(Box::new(e)),
        })
    }
}

#[derive(Debug, Deserialize)]
struct KeywordOverviewResponse {
    #[serde(flatten)]
    data: KeywordData,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    organic: Vec<SerpResult>,
    #[serde(default)]
    people_also_ask: Vec<String>,
    #[serde(default)]
    competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
struct RelatedKeywordsResponse {
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

#[async_trait]
impl ResearchSource for HttpResearchSource {
    async fn perform_research(&self, keyword: &str, depth: ResearchDepth) -> Result<RawResearch> {
        let overview: KeywordOverviewResponse = self
            .get_json("/keyword-overview", &[("keyword", keyword.to_string())])
            .await?;

        let serp: SerpResponse = self
            .get_json(
                "/serp",
                &[
                    ("keyword", keyword.to_string()),
                    ("depth", depth.serp_depth.to_string()),
                ],
            )
            .await?;

        let related: RelatedKeywordsResponse = self
            .get_json(
                "/related-keywords",
                &[
                    ("keyword", keyword.to_string()),
                    ("limit", depth.related_limit.to_string()),
                ],
            )
            .await?;

        let suggestions: SuggestionsResponse = self
            .get_json(
                "/keyword-suggestions",
                &[
                    ("keyword", keyword.to_string()),
                    ("limit", depth.suggestions_limit.to_string()),
                ],
            )
            .await?;

        Ok(RawResearch {
            keyword: keyword.to_string(),
            keyword_data: overview.data,
            serp_results: serp.organic,
            paa_questions: serp.people_also_ask,
            related_keywords: related.keywords,
            keyword_suggestions: suggestions.suggestions,
            competitors: serp.competitors,
            total_cost: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_without_panicking() {
        let _source = HttpResearchSource::new("https://example.com/api", "key");
    }
}
