//! ABOUTME: Process-wide agent registry (§4.4) — a simple type-keyed map, not a
//! ABOUTME: discovery/metadata service; agents are stateless singletons looked up by type

use dashmap::DashMap;
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::traits::agent::Agent;
use std::sync::Arc;

/// Maps each `AgentType` to its singleton implementation. Safe for concurrent
/// lookup from the orchestrator's worker pool; `register` is also used by
/// tests to inject stand-ins for a specific agent type.
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<AgentType, Arc<dyn Agent>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.agent_type(), agent);
    }

    pub fn get(&self, agent_type: AgentType) -> Result<Arc<dyn Agent>> {
        self.agents
            .get(&agent_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PipelineError::AgentNotFound(agent_type.as_str().to_string()))
    }

    /// Builds a registry with the five standard pipeline agents already registered.
    #[must_use]
    pub fn with_default_agents() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(crate::research::ResearchAgent::new()));
        registry.register(Arc::new(crate::writer::WriterAgent::new()));
        registry.register(Arc::new(crate::seo::SeoAgent::new()));
        registry.register(Arc::new(crate::qa::QaAgent::new()));
        registry.register(Arc::new(crate::project_manager::ProjectManagerAgent::new()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_default_agents_resolves_every_agent_type() {
        let registry = AgentRegistry::with_default_agents();
        for agent_type in AgentType::ALL {
            assert!(registry.get(agent_type).is_ok());
        }
    }

    #[test]
    fn unregistered_agent_type_is_not_found() {
        let registry = AgentRegistry::new();
        assert!(matches!(registry.get(AgentType::Writer), Err(PipelineError::AgentNotFound(_))));
    }

    #[test]
    fn register_overwrites_the_previous_entry_for_a_type() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(crate::research::ResearchAgent::new()));
        registry.register(Arc::new(crate::research::ResearchAgent::new()));
        assert!(registry.get(AgentType::Research).is_ok());
    }
}
