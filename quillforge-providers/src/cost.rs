//! ABOUTME: Table-driven per-million-token pricing (§4.1 calculateCost)

use quillforge_core::agent_io::TokenUsage;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct Rate {
    prompt_per_million: f64,
    completion_per_million: f64,
}

pub struct PricingTable {
    rates: HashMap<&'static str, Rate>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert(
            "gpt-4o",
            Rate {
                prompt_per_million: 2.50,
                completion_per_million: 10.00,
            },
        );
        rates.insert(
            "gpt-4o-mini",
            Rate {
                prompt_per_million: 0.15,
                completion_per_million: 0.60,
            },
        );
        rates.insert(
            "claude-3-5-sonnet",
            Rate {
                prompt_per_million: 3.00,
                completion_per_million: 15.00,
            },
        );
        rates.insert(
            "claude-3-5-haiku",
            Rate {
                prompt_per_million: 0.80,
                completion_per_million: 4.00,
            },
        );
        Self { rates }
    }
}

impl PricingTable {
    /// Returns 0 (with a warning) for any model not in the table, per §4.1.
    #[must_use]
    pub fn cost_for(&self, model: &str, usage: TokenUsage) -> f64 {
        let Some(rate) = self.rates.get(model) else {
            warn!(model, "no pricing entry for model, reporting zero cost");
            return 0.0;
        };
        let prompt_cost = f64::from(usage.prompt_tokens) / 1_000_000.0 * rate.prompt_per_million;
        let completion_cost =
            f64::from(usage.completion_tokens) / 1_000_000.0 * rate.completion_per_million;
        prompt_cost + completion_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_computes_blended_cost() {
        let table = PricingTable::default();
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
        };
        let cost = table.cost_for("gpt-4o-mini", usage);
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_is_zero_cost() {
        let table = PricingTable::default();
        let usage = TokenUsage {
            prompt_tokens: 1000,
            completion_tokens: 1000,
        };
        assert_eq!(table.cost_for("some-future-model", usage), 0.0);
    }
}
