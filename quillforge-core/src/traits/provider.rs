//! ABOUTME: LLM Provider capability (§4.1) — the seam `quillforge-providers` implements
//! ABOUTME: and every agent that talks to an LLM depends on, by trait object only

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub stop_sequences: Vec<String>,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: crate::agent_io::TokenUsage,
    pub model: String,
    pub stop_reason: StopReason,
    pub cost_usd: f64,
}

/// A streamed content delta (§4.1 `stream`).
#[derive(Debug, Clone)]
pub struct CompletionChunk {
    pub delta: String,
    pub done: bool,
}

pub type ChunkCallback = Box<dyn FnMut(CompletionChunk) + Send>;

/// Uniform capability for text/JSON completion across vendors (§4.1).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> crate::error::Result<CompletionResponse>;

    /// Streaming variant. Implementations above the streaming threshold (§4.1,
    /// recommended 8000 max tokens) MUST use the upstream's streaming transport
    /// even when `on_chunk` is `None` — some upstreams require it for long
    /// requests. The default forwards to `complete` and replays it as one chunk.
    async fn stream(
        &self,
        request: CompletionRequest,
        on_chunk: Option<ChunkCallback>,
    ) -> crate::error::Result<CompletionResponse> {
        let response = self.complete(request).await?;
        if let Some(mut cb) = on_chunk {
            cb(CompletionChunk {
                delta: response.content.clone(),
                done: true,
            });
        }
        Ok(response)
    }

    /// Coarse token estimate (`len/4`), for logging only — never used to gate.
    fn estimate_tokens(&self, text: &str) -> u32 {
        ((text.chars().count() as f64) / 4.0).ceil() as u32
    }

    /// Table-driven per-million-token pricing; 0 (with a warning) for unknown models.
    fn calculate_cost(&self, model: &str, usage: crate::agent_io::TokenUsage) -> f64;
}

/// `generateJSON` (§4.1) is implemented once, generically, over any `LlmProvider`
/// — see `quillforge-providers::json_completion`. It is not itself part of the
/// trait so the tolerant-repair pipeline (`quillforge-utils`) isn't a core
/// dependency.
pub const STREAMING_THRESHOLD_TOKENS: u32 = 8000;
