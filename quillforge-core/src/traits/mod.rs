//! ABOUTME: Trait seams implemented by the provider/storage/research crates and
//! ABOUTME: consumed by the agents/orchestrator crates via `Arc<dyn ...>`

pub mod agent;
pub mod provider;
pub mod repository;
pub mod research;

pub use agent::{Agent, AgentContext, ProgressCallback};
pub use provider::LlmProvider;
pub use repository::Repository;
pub use research::ResearchSource;
