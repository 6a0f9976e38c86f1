//! ABOUTME: Fixture builders for Job/JobSettings/Persona, used across the workspace's test suites

use quillforge_core::agent_type::AgentType;
use quillforge_core::ids::PersonaId;
use quillforge_core::job::{Job, JobSettings};
use quillforge_core::persona::Persona;

#[must_use]
pub fn sample_job_settings() -> JobSettings {
    JobSettings {
        auto_post: false,
        target_word_count: 1200,
        max_iterations: 3,
        template: "article".to_string(),
        parent_page_id: None,
        persona_overrides: std::collections::HashMap::new(),
        skip_agents: std::collections::HashSet::new(),
        context: None,
    }
}

#[must_use]
pub fn sample_job() -> Job {
    Job::new("best running shoes".to_string(), sample_job_settings(), 0, "tester".to_string())
}

#[must_use]
pub fn sample_persona(agent_type: AgentType) -> Persona {
    Persona {
        id: PersonaId::new(),
        agent_type,
        name: format!("default-{}", agent_type.as_str()),
        system_prompt: "You are a careful, factual content assistant.".to_string(),
        provider: "mock".to_string(),
        model: "mock-large".to_string(),
        temperature: 0.7,
        max_tokens: 4000,
        is_default: true,
        is_enabled: true,
        deleted_at: None,
    }
}
