//! ABOUTME: Shared helpers consumed by the providers, agents, and orchestrator crates
//! ABOUTME: Retry/backoff, tolerant JSON repair, slugs, and the QA prohibited-pattern scan

pub mod json_repair;
pub mod prohibited_patterns;
pub mod retry;
pub mod slug;

pub use json_repair::repair_and_parse;
pub use retry::{default_is_retryable, with_retry, RetryConfig};
pub use slug::slugify;
