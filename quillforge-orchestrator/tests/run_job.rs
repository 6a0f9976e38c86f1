//! ABOUTME: End-to-end exercise of `Orchestrator::run_job` against mock doubles,
//! ABOUTME: the one place that proves the agent wiring, persona resolution, and
//! ABOUTME: provider lookup all agree with each other

use quillforge_agents::registry::AgentRegistry;
use quillforge_core::agent_type::AgentType;
use quillforge_core::job::JobStatus;
use quillforge_core::traits::provider::LlmProvider;
use quillforge_orchestrator::{compensation::NoopCompensationHook, metrics::Metrics, pipeline::Orchestrator};
use quillforge_providers::config::ProviderConfig;
use quillforge_providers::registry::{ProviderManager, ProviderRegistry};
use quillforge_testing::{sample_job, MockProvider, MockRepository, MockResearchSource};
use std::sync::Arc;

const WRITER_RESPONSE: &str = r#"{
    "title": "Best Running Shoes for Everyday Training",
    "slug": "placeholder",
    "content": "Picking the right running shoe comes down to fit, cushioning, and how many miles you log each week. Start with a shoe built for your gait, then break it in over a few easy runs before a long race.",
    "excerpt": "A practical guide to choosing running shoes for everyday training.",
    "wordCount": 1200,
    "headings": [{"level": 2, "text": "Finding the Right Fit"}, {"level": 2, "text": "Cushioning and Mileage"}]
}"#;

const SEO_RESPONSE: &str = r#"{
    "metaTitle": "Best Running Shoes Guide",
    "metaDescription": "Find the best running shoes for your training needs and mileage.",
    "headingAnalysis": {"isValid": true, "issues": [], "suggestions": []},
    "keywordDensity": {"percentage": 1.4, "analysis": "within the healthy range"},
    "schemaMarkup": {"@type": "Article"},
    "optimizationScore": 86
}"#;

const QA_RESPONSE: &str = r#"{
    "passed": true,
    "overallScore": 88,
    "dimensionScores": {"readability": 85, "seo": 90, "accuracy": 88, "engagement": 84, "brandVoice": 90},
    "issues": [],
    "feedback": "Solid draft, ready to publish."
}"#;

async fn build_orchestrator(
    repository: Arc<MockRepository>,
) -> Orchestrator {
    let mock_provider = Arc::new(MockProvider::with_responses(
        "mock",
        vec![WRITER_RESPONSE.to_string(), SEO_RESPONSE.to_string(), QA_RESPONSE.to_string()],
    ));

    let mut registry = ProviderRegistry::new();
    registry.register("mock", {
        let mock_provider = Arc::clone(&mock_provider);
        move |_config| Arc::clone(&mock_provider) as Arc<dyn LlmProvider>
    });
    let provider_manager = Arc::new(ProviderManager::new(registry));
    provider_manager
        .init_provider(ProviderConfig::new("mock", "mock-large"), true)
        .await
        .unwrap();

    Orchestrator::new(
        Arc::new(AgentRegistry::with_default_agents()),
        repository,
        Arc::new(MockResearchSource::new()),
        provider_manager,
        Arc::new(NoopCompensationHook),
        Arc::new(Metrics::new()),
    )
}

fn seed_personas(repository: &MockRepository) {
    for agent_type in AgentType::ALL {
        repository.seed_persona(quillforge_testing::sample_persona(agent_type));
    }
}

#[tokio::test]
async fn a_full_run_reaches_completed_with_a_populated_final_output() {
    let repository = Arc::new(MockRepository::new());
    seed_personas(&repository);
    let orchestrator = build_orchestrator(Arc::clone(&repository)).await;

    let job = sample_job();
    let job_id = job.id;
    let result = orchestrator.run_job(job).await;

    assert!(result.success, "job failed: {:?}", result.error);
    assert!(!result.cancelled);
    assert_eq!(result.iterations, 1);

    let stored = repository.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.progress_percent, 100);
    let final_output = stored.final_output.expect("final_output must be set on completion");
    assert_eq!(final_output["readyForPublish"], true);
    assert!(stored.total_tokens_used > 0);
}

#[tokio::test]
async fn a_job_cancelled_before_it_starts_never_reaches_processing() {
    let repository = Arc::new(MockRepository::new());
    seed_personas(&repository);
    let orchestrator = build_orchestrator(Arc::clone(&repository)).await;

    let job = repository
        .create_job("trail shoes".into(), quillforge_testing::sample_job_settings(), 0, "tester".into())
        .await
        .unwrap();
    let cancelled = repository.cancel_job(job.id, "tester".into()).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    let result = orchestrator.run_job(cancelled).await;
    assert!(result.cancelled);
    assert!(!result.success);
}

#[tokio::test]
async fn a_missing_persona_fails_the_job_instead_of_panicking() {
    let repository = Arc::new(MockRepository::new());
    // Deliberately leave personas unseeded.
    let orchestrator = build_orchestrator(Arc::clone(&repository)).await;

    let job = sample_job();
    let job_id = job.id;
    let result = orchestrator.run_job(job).await;

    assert!(!result.success);
    assert!(result.error.is_some());
    let stored = repository.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.last_error.is_some());
}
