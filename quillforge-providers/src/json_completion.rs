//! ABOUTME: `generateJSON` (§4.1) — schema-validated completion built generically
//! ABOUTME: over any `LlmProvider`, using the tolerant JSON Repair pipeline

use quillforge_core::agent_io::TokenUsage;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::provider::{ChatMessage, CompletionRequest, LlmProvider};
use quillforge_utils::repair_and_parse;
use serde_json::Value;
use tracing::warn;

const JSON_DIRECTIVE: &str =
    "Respond with valid JSON only. No markdown code fences, no prose before or after the JSON.";

pub struct JsonCompletion {
    pub value: Value,
    pub usage: TokenUsage,
    pub cost_usd: f64,
}

/// High-level JSON completion helper (§4.1 generateJSON).
///
/// Augments the system prompt with a JSON-only directive, calls the text
/// completion path, repairs/validates the result against `schema`, and
/// retries with a fresh call (not a repair retry — a new model call) up to
/// `max_retries` times on validation failure.
pub async fn generate_json(
    provider: &dyn LlmProvider,
    prompt: &str,
    system_prompt: Option<&str>,
    model: &str,
    schema: &Value,
    max_retries: u32,
) -> Result<JsonCompletion> {
    let augmented_system = match system_prompt {
        Some(existing) => format!("{existing}\n\n{JSON_DIRECTIVE}"),
        None => JSON_DIRECTIVE.to_string(),
    };

    let mut total_usage = TokenUsage::default();
    let mut total_cost = 0.0;
    let mut last_error = None;

    for attempt in 0..=max_retries {
        let mut request = CompletionRequest::new(model, vec![ChatMessage::user(prompt)]);
        request.system_prompt = Some(augmented_system.clone());
        request.temperature = Some(0.3);

        let response = provider.complete(request).await?;
        total_usage = TokenUsage {
            prompt_tokens: total_usage.prompt_tokens + response.usage.prompt_tokens,
            completion_tokens: total_usage.completion_tokens + response.usage.completion_tokens,
        };
        total_cost += response.cost_usd;

        match repair_and_parse(&response.content, schema) {
            Ok(value) => {
                return Ok(JsonCompletion {
                    value,
                    usage: total_usage,
                    cost_usd: total_cost,
                })
            }
            Err(err) => {
                warn!(attempt, %err, "generateJSON validation failed, retrying");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        PipelineError::internal("generateJSON exhausted retries with no recorded error")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quillforge_core::traits::provider::{CompletionResponse, StopReason};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedProvider {
        responses: Vec<&'static str>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let content = self.responses[idx.min(self.responses.len() - 1)].to_string();
            Ok(CompletionResponse {
                content,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 20,
                },
                model: "scripted-model".into(),
                stop_reason: StopReason::EndTurn,
                cost_usd: 0.01,
            })
        }

        fn calculate_cost(&self, _model: &str, _usage: TokenUsage) -> f64 {
            0.01
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_valid_response() {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            responses: vec![r#"{"a": 1}"#],
            calls: AtomicU32::new(0),
        });
        let schema = json!({"type": "object", "required": ["a"]});
        let result = generate_json(provider.as_ref(), "prompt", None, "m", &schema, 2)
            .await
            .unwrap();
        assert_eq!(result.value["a"], 1);
    }

    #[tokio::test]
    async fn retries_on_schema_mismatch_then_succeeds() {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            responses: vec!["not json at all", r#"{"a": 1}"#],
            calls: AtomicU32::new(0),
        });
        let schema = json!({"type": "object", "required": ["a"]});
        let result = generate_json(provider.as_ref(), "prompt", None, "m", &schema, 2)
            .await
            .unwrap();
        assert_eq!(result.value["a"], 1);
        assert_eq!(result.usage.prompt_tokens, 20);
    }

    #[tokio::test]
    async fn surfaces_last_validation_error_when_retries_exhausted() {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            responses: vec!["nope", "still nope", "nope again"],
            calls: AtomicU32::new(0),
        });
        let schema = json!({"type": "object", "required": ["a"]});
        let err = generate_json(provider.as_ref(), "prompt", None, "m", &schema, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
    }
}
