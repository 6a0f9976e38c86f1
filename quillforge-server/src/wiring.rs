//! ABOUTME: Assembles the production stack (repository, providers, orchestrator, worker)
//! ABOUTME: from a loaded `quillforge_config::Config` — the one place `main` delegates to

use quillforge_agents::registry::AgentRegistry;
use quillforge_core::error::Result;
use quillforge_orchestrator::{CrashRecoveryAction as OrchestratorCrashRecoveryAction, Metrics, NoopCompensationHook, Orchestrator, Worker, WorkerSettings};
use quillforge_providers::config::ProviderConfig;
use quillforge_providers::http_provider::HttpLlmProvider;
use quillforge_providers::registry::{ProviderManager, ProviderRegistry};
use quillforge_research::HttpResearchSource;
use quillforge_storage::{PostgresConfig, PostgresRepository};
use std::sync::Arc;

pub struct Stack {
    pub repository: Arc<PostgresRepository>,
    pub orchestrator: Arc<Orchestrator>,
    pub worker: Arc<Worker>,
    pub metrics: Arc<Metrics>,
    pub default_max_iterations: u32,
}

/// One `HttpLlmProvider` instance per credentialed vendor (§4.1). The first
/// provider found with a non-empty API key becomes the default; callers that
/// don't care which vendor serves a persona fall back to it.
async fn build_provider_manager(credentials: &quillforge_config::ProviderCredentials) -> Result<Arc<ProviderManager>> {
    let mut registry = ProviderRegistry::new();
    registry.register("openai", |config| Arc::new(HttpLlmProvider::new(config)));
    registry.register("anthropic", |config| Arc::new(HttpLlmProvider::new(config)));
    let manager = Arc::new(ProviderManager::new(registry));

    let vendors = [
        ("openai", &credentials.openai_api_key_env),
        ("anthropic", &credentials.anthropic_api_key_env),
    ];
    let mut any_default = false;
    for (name, key_env) in vendors {
        let Ok(api_key) = std::env::var(key_env) else {
            continue;
        };
        let mut config = ProviderConfig::from_env(name);
        config.api_key = Some(api_key);
        manager.init_provider(config, !any_default).await?;
        any_default = true;
    }
    Ok(manager)
}

fn map_crash_recovery(action: quillforge_config::CrashRecoveryAction) -> OrchestratorCrashRecoveryAction {
    match action {
        quillforge_config::CrashRecoveryAction::ResetToPending => OrchestratorCrashRecoveryAction::ResetToPending,
        quillforge_config::CrashRecoveryAction::Fail => OrchestratorCrashRecoveryAction::Fail,
    }
}

/// Builds the full in-process stack (everything but the HTTP listener itself).
///
/// # Errors
/// Returns an error if the database is unreachable or no provider credentials
/// are configured.
pub async fn build_stack(config: &quillforge_config::Config) -> Result<Stack> {
    let postgres_config =
        PostgresConfig::new(config.database.connection_string.clone()).with_max_pool_size(config.database.max_pool_size);
    let repository = Arc::new(PostgresRepository::new(postgres_config).await?);

    let provider_manager = build_provider_manager(&config.providers).await?;

    let research_source: Arc<dyn quillforge_core::traits::research::ResearchSource> =
        Arc::new(HttpResearchSource::new(
            std::env::var("QUILLFORGE_RESEARCH_BASE_URL").unwrap_or_else(|_| "https://research.internal".to_string()),
            std::env::var("QUILLFORGE_RESEARCH_API_KEY").unwrap_or_default(),
        ));

    let agents = Arc::new(AgentRegistry::with_default_agents());
    let metrics = Arc::new(Metrics::new());

    let orchestrator = Arc::new(Orchestrator::new(
        agents,
        Arc::clone(&repository) as Arc<dyn quillforge_core::traits::repository::Repository>,
        research_source,
        provider_manager,
        Arc::new(NoopCompensationHook),
        Arc::clone(&metrics),
    ));

    let worker_settings = WorkerSettings {
        max_concurrent_jobs: config.worker.max_concurrent_jobs,
        job_timeout_minutes: config.worker.job_timeout_minutes,
        crash_recovery_action: map_crash_recovery(config.worker.crash_recovery_action),
    };
    let worker = Arc::new(Worker::new(
        Arc::clone(&orchestrator),
        Arc::clone(&repository) as Arc<dyn quillforge_core::traits::repository::Repository>,
        worker_settings,
    ));

    Ok(Stack {
        repository,
        orchestrator,
        worker,
        metrics,
        default_max_iterations: config.worker.default_max_iterations,
    })
}
