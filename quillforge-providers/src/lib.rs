//! ABOUTME: LLM provider integrations: HTTP completion, cost tables, registry, generateJSON
//! ABOUTME: Implements the `LlmProvider` trait seam declared in `quillforge-core`

pub mod config;
pub mod cost;
pub mod http_provider;
pub mod json_completion;
pub mod registry;

pub use config::ProviderConfig;
pub use http_provider::HttpLlmProvider;
pub use json_completion::{generate_json, JsonCompletion};
pub use registry::{ProviderManager, ProviderRegistry};
