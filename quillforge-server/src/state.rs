//! ABOUTME: Shared application state handed to every axum handler (cf. `llmspell-web`'s `AppState`)

use quillforge_core::traits::repository::Repository;
use quillforge_orchestrator::Metrics;
use std::sync::Arc;

/// Handed to every axum handler. The HTTP layer only ever talks to jobs
/// through the `Repository` — job execution itself is the Worker's job, not
/// the API's (§4.5, §4.7).
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub metrics: Arc<Metrics>,
    pub admin_api_key: Option<String>,
    /// Applied to `POST /jobs` requests that omit `settings` entirely (§4.7's
    /// operator-configurable default, `worker.default_max_iterations`).
    pub default_max_iterations: u32,
}

impl AppState {
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        metrics: Arc<Metrics>,
        admin_api_key: Option<String>,
        default_max_iterations: u32,
    ) -> Self {
        Self {
            repository,
            metrics,
            admin_api_key,
            default_max_iterations,
        }
    }
}
