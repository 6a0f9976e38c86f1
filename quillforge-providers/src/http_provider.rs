//! ABOUTME: Chat-completions-compatible HTTP provider (§4.1) over an OpenAI-shaped wire format
//! ABOUTME: Vendor specifics (endpoint, model catalogue, pricing) come from `ProviderConfig`

use crate::config::ProviderConfig;
use crate::cost::PricingTable;
use async_trait::async_trait;
use futures::StreamExt;
use quillforge_core::agent_io::TokenUsage;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::provider::{
    ChatMessage, ChunkCallback, CompletionChunk, CompletionRequest, CompletionResponse, LlmProvider, StopReason,
    STREAMING_THRESHOLD_TOKENS,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Talks to any upstream exposing the widely-adopted `/chat/completions` shape
/// (OpenAI, and the many OpenAI-compatible gateways layered in front of other
/// vendors). One instance per configured provider name.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    pricing: PricingTable,
}

impl HttpLlmProvider {
    /// # Panics
    /// Panics if the HTTP client cannot be constructed (invalid TLS config, etc).
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            config,
            pricing: PricingTable::default(),
        }
    }

    fn endpoint(&self) -> String {
        self.config
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
    }

    fn to_wire_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<Value> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system_prompt {
            wire.push(json!({"role": "system", "content": system}));
        }
        for m in messages {
            wire.push(json!({"role": m.role, "content": m.content}));
        }
        wire
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = json!({
            "model": request.model,
            "messages": Self::to_wire_messages(request.system_prompt.as_deref(), &request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stop": request.stop_sequences,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.clone().unwrap_or_default())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamTransient {
                message: format!("request to {} failed: {e}", self.config.name),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(PipelineError::Auth {
                message: format!("{} rejected credentials ({status})", self.config.name),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if let Some(secs) = retry_after {
                debug!(provider = %self.config.name, secs, "upstream requested retry-after delay");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
            return Err(PipelineError::UpstreamTransient {
                message: format!("{} returned {status}", self.config.name),
                source: None,
            });
        }

        if status.is_client_error() {
            return Err(PipelineError::UpstreamPermanent {
                message: format!("{} rejected request: {status}", self.config.name),
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::Provider {
                    message: format!("malformed response from {}: {e}", self.config.name),
                    provider: Some(self.config.name.clone()),
                    source: Some(Box::new(e)),
                })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Provider {
                message: format!("{} returned no completion choices", self.config.name),
                provider: Some(self.config.name.clone()),
                source: None,
            })?;

        let usage = TokenUsage {
            prompt_tokens: parsed.usage.as_ref().map_or(0, |u| u.prompt_tokens),
            completion_tokens: parsed.usage.as_ref().map_or(0, |u| u.completion_tokens),
        };
        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("stop_sequence" | "stop") if !request.stop_sequences.is_empty() => {
                StopReason::StopSequence
            }
            _ => StopReason::EndTurn,
        };
        let cost_usd = self.calculate_cost(&request.model, usage);

        Ok(CompletionResponse {
            content: choice.message.content,
            usage,
            model: request.model.clone(),
            stop_reason,
            cost_usd,
        })
    }

    /// Real SSE streaming transport (§4.1: mandatory above `STREAMING_THRESHOLD_TOKENS`).
    /// Upstreams using the OpenAI-compatible wire format emit `data: {...}` lines
    /// terminated by `data: [DONE]`; usage isn't reported mid-stream by most
    /// vendors, so it's estimated from the accumulated content on completion.
    async fn send_streaming(&self, request: &CompletionRequest, mut on_chunk: Option<ChunkCallback>) -> Result<CompletionResponse> {
        let mut body = json!({
            "model": request.model,
            "messages": Self::to_wire_messages(request.system_prompt.as_deref(), &request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stop": request.stop_sequences,
        });
        body["stream"] = Value::Bool(true);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.clone().unwrap_or_default())
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamTransient {
                message: format!("streaming request to {} failed: {e}", self.config.name),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::UpstreamTransient {
                message: format!("{} returned {} for a streaming request", self.config.name, response.status()),
                source: None,
            });
        }

        let mut content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::UpstreamTransient {
                message: format!("{} streaming response interrupted: {e}", self.config.name),
                source: Some(Box::new(e)),
            })?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    continue;
                }
                if let Ok(event) = serde_json::from_str::<ChatCompletionStreamEvent>(data) {
                    if let Some(choice) = event.choices.into_iter().next() {
                        if let Some(delta) = choice.delta.content {
                            content.push_str(&delta);
                            if let Some(cb) = on_chunk.as_mut() {
                                cb(CompletionChunk { delta, done: false });
                            }
                        }
                        if choice.finish_reason.as_deref() == Some("length") {
                            stop_reason = StopReason::MaxTokens;
                        }
                    }
                }
            }
        }

        if let Some(cb) = on_chunk.as_mut() {
            cb(CompletionChunk { delta: String::new(), done: true });
        }
        if stop_reason == StopReason::MaxTokens {
            warn!(model = %request.model, "streamed completion truncated at max_tokens");
        }

        let usage = TokenUsage {
            prompt_tokens: 0,
            completion_tokens: self.estimate_tokens(&content),
        };
        let cost_usd = self.calculate_cost(&request.model, usage);

        Ok(CompletionResponse {
            content,
            usage,
            model: request.model.clone(),
            stop_reason,
            cost_usd,
        })
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let response = self.send(&request).await?;
        if response.stop_reason == StopReason::MaxTokens {
            warn!(model = %request.model, "completion truncated at max_tokens");
        }
        Ok(response)
    }

    async fn stream(&self, request: CompletionRequest, on_chunk: Option<ChunkCallback>) -> Result<CompletionResponse> {
        let exceeds_threshold = request.max_tokens.is_some_and(|tokens| tokens > STREAMING_THRESHOLD_TOKENS);
        if !exceeds_threshold && on_chunk.is_none() {
            return self.complete(request).await;
        }
        self.send_streaming(&request, on_chunk).await
    }

    fn calculate_cost(&self, model: &str, usage: TokenUsage) -> f64 {
        self.pricing.cost_for(model, usage)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamEvent {
    choices: Vec<ChatCompletionStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionStreamChoice {
    delta: ChatCompletionStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionStreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_to_openai_when_unset() {
        let provider = HttpLlmProvider::new(ProviderConfig::new("openai", "gpt-4o-mini"));
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn endpoint_honors_override() {
        let mut config = ProviderConfig::new("local", "llama3");
        config.endpoint = Some("http://localhost:8080/v1/chat/completions".into());
        let provider = HttpLlmProvider::new(config);
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn wire_messages_prepend_system_prompt() {
        let messages = vec![ChatMessage::user("hello")];
        let wire = HttpLlmProvider::to_wire_messages(Some("be concise"), &messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
    }

    #[test]
    fn stream_event_parses_a_content_delta() {
        let event: ChatCompletionStreamEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#).unwrap();
        assert_eq!(event.choices[0].delta.content.as_deref(), Some("Hello"));
        assert!(event.choices[0].finish_reason.is_none());
    }

    #[test]
    fn stream_event_tolerates_an_empty_delta() {
        let event: ChatCompletionStreamEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#).unwrap();
        assert!(event.choices[0].delta.content.is_none());
        assert_eq!(event.choices[0].finish_reason.as_deref(), Some("length"));
    }

    #[test]
    fn request_above_threshold_is_flagged_for_mandatory_streaming() {
        let mut request = CompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        request.max_tokens = Some(STREAMING_THRESHOLD_TOKENS + 1);
        assert!(request.max_tokens.is_some_and(|tokens| tokens > STREAMING_THRESHOLD_TOKENS));
    }
}
