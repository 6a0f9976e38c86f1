//! ABOUTME: Scripted LlmProvider double — replays a queue of canned completions, no network calls

use async_trait::async_trait;
use parking_lot::Mutex;
use quillforge_core::agent_io::TokenUsage;
use quillforge_core::error::Result;
use quillforge_core::traits::provider::{CompletionRequest, CompletionResponse, LlmProvider, StopReason};
use std::collections::VecDeque;

/// Replays canned completions in order; once exhausted, repeats the last one.
pub struct MockProvider {
    name: String,
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl MockProvider {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(String::new()),
        }
    }

    #[must_use]
    pub fn with_responses(name: impl Into<String>, responses: Vec<String>) -> Self {
        let provider = Self::new(name);
        *provider.responses.lock() = responses.into_iter().collect();
        provider
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(response.into());
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let content = {
            let mut queue = self.responses.lock();
            let content = queue.pop_front().unwrap_or_else(|| self.last.lock().clone());
            *self.last.lock() = content.clone();
            content
        };
        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 100,
            },
            model: request.model,
            stop_reason: StopReason::EndTurn,
            cost_usd: 0.001,
        })
    }

    fn calculate_cost(&self, _model: &str, _usage: TokenUsage) -> f64 {
        0.001
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillforge_core::traits::provider::ChatMessage;

    #[tokio::test]
    async fn replays_queued_responses_in_order() {
        let provider = MockProvider::with_responses("mock", vec!["first".into(), "second".into()]);
        let request = CompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        let first = provider.complete(request).await.unwrap();
        assert_eq!(first.content, "first");
    }

    #[tokio::test]
    async fn repeats_last_response_once_exhausted() {
        let provider = MockProvider::with_responses("mock", vec!["only".into()]);
        let request = CompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        provider.complete(request.clone()).await.unwrap();
        let second = provider.complete(request).await.unwrap();
        assert_eq!(second.content, "only");
    }
}
