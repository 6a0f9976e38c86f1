//! ABOUTME: URL slug generation for the Project Manager agent's publish step (§4.3)

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, collapse runs of non-alphanumerics to a single hyphen, trim
/// leading/trailing hyphens. Deterministic and locale-independent, so the
/// Project Manager agent's output stays byte-identical for identical input.
#[must_use]
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    let hyphenated = NON_ALPHANUMERIC.replace_all(&lower, "-");
    hyphenated.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_and_whitespace() {
        assert_eq!(slugify("Best Coffee Makers: 2026 Guide!"), "best-coffee-makers-2026-guide");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Hello World--  "), "hello-world");
    }

    #[test]
    fn is_idempotent() {
        let once = slugify("Already-A-Slug");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn handles_empty_input() {
        assert_eq!(slugify("   ---   "), "");
    }
}
