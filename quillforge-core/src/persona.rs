//! ABOUTME: Persona — static per-agent-type LLM configuration (§3 Persona)

use crate::agent_type::AgentType;
use crate::ids::PersonaId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static config bound to an agent type: system prompt, provider/model choice,
/// and decoding parameters. Exactly one persona per `agent_type` may have
/// `is_default = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub agent_type: AgentType,
    pub name: String,
    pub system_prompt: String,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub is_default: bool,
    pub is_enabled: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Persona {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_enabled && self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_deleted_persona_is_inactive() {
        let mut persona = Persona {
            id: PersonaId::new(),
            agent_type: AgentType::Writer,
            name: "default-writer".into(),
            system_prompt: "Write engaging articles.".into(),
            provider: "anthropic".into(),
            model: "claude".into(),
            temperature: 0.7,
            max_tokens: 8000,
            is_default: true,
            is_enabled: true,
            deleted_at: None,
        };
        assert!(persona.is_active());
        persona.deleted_at = Some(Utc::now());
        assert!(!persona.is_active());
    }
}
