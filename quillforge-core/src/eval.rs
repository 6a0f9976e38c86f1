//! ABOUTME: QA evaluation records and the stable-fingerprint Issue type (§3 Eval, Issue)

use crate::ids::{EvalId, StepId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// A QA finding with a stable identifier so the orchestrator and the QA agent
/// can tell persisting issues from fixed ones across iterations (§3 Issue, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub issue_id: String,
    pub category: String,
    pub severity: IssueSeverity,
    pub description: String,
    pub suggestion: String,
    pub location: Option<String>,
    pub persist_count: u32,
}

impl Issue {
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        severity: IssueSeverity,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        let category = category.into();
        let description = description.into();
        let issue_id = fingerprint(&category, &description);
        Self {
            issue_id,
            category,
            severity,
            description,
            suggestion: suggestion.into(),
            location: None,
            persist_count: 1,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// `hash(category + normalized-description)` — lowercased, whitespace-collapsed,
/// so cosmetic rewording of the same finding still fingerprints identically.
#[must_use]
pub fn fingerprint(category: &str, description: &str) -> String {
    let normalized_desc = description
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(category.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(normalized_desc.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Per-dimension QA scores, each in `[0, 100]` (§3 Eval, §6.3 QAOutput).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub readability: u8,
    pub seo: u8,
    pub accuracy: u8,
    pub engagement: u8,
    pub brand_voice: u8,
}

impl DimensionScores {
    /// Equal-weighted mean (§4.3 QA Agent, §9 Open Questions: weighting is
    /// configurable but this spec's default is equal weights).
    #[must_use]
    pub fn mean(self) -> f64 {
        let sum = u32::from(self.readability)
            + u32::from(self.seo)
            + u32::from(self.accuracy)
            + u32::from(self.engagement)
            + u32::from(self.brand_voice);
        f64::from(sum) / 5.0
    }
}

/// Persistent QA score record linked to a step (§3 Eval, §6.2 `job_evals`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eval {
    pub id: EvalId,
    pub step_id: StepId,
    pub iteration: u32,
    pub overall_score: u8,
    pub dimension_scores: DimensionScores,
    pub passed: bool,
    pub issues: Vec<Issue>,
    pub feedback: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_whitespace_and_case() {
        let a = fingerprint("readability", "Sentences   are too long");
        let b = fingerprint("Readability", "sentences are too long");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_for_different_descriptions() {
        let a = fingerprint("readability", "sentences are too long");
        let b = fingerprint("readability", "paragraphs lack structure");
        assert_ne!(a, b);
    }

    #[test]
    fn dimension_mean_is_equal_weighted() {
        let scores = DimensionScores {
            readability: 80,
            seo: 70,
            accuracy: 90,
            engagement: 60,
            brand_voice: 100,
        };
        assert!((scores.mean() - 80.0).abs() < f64::EPSILON);
    }
}
