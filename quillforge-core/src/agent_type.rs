//! ABOUTME: The five cooperating agent kinds and their fixed pipeline order

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five pipeline agents (§1, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Research,
    Writer,
    Seo,
    Qa,
    ProjectManager,
}

impl AgentType {
    /// Fixed pipeline order (§4.6 "Pipeline (default order)").
    pub const ALL: [AgentType; 5] = [
        AgentType::Research,
        AgentType::Writer,
        AgentType::Seo,
        AgentType::Qa,
        AgentType::ProjectManager,
    ];

    /// Per-agent progress weight (§4.6 "Progress accounting"), summing to 100.
    #[must_use]
    pub const fn progress_weight(self) -> u8 {
        match self {
            Self::Research => 15,
            Self::Writer => 35,
            Self::Seo => 15,
            Self::Qa => 15,
            Self::ProjectManager => 20,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Writer => "writer",
            Self::Seo => "seo",
            Self::Qa => "qa",
            Self::ProjectManager => "project_manager",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_weights_sum_to_100() {
        let total: u16 = AgentType::ALL.iter().map(|a| a.progress_weight() as u16).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn pipeline_order_matches_spec() {
        assert_eq!(
            AgentType::ALL,
            [
                AgentType::Research,
                AgentType::Writer,
                AgentType::Seo,
                AgentType::Qa,
                AgentType::ProjectManager,
            ]
        );
    }
}
