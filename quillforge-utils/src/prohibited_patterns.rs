//! ABOUTME: Deterministic prohibited-pattern scan for the QA agent (§4.3 QA Agent)
//! ABOUTME: Runs before any LLM scoring so banned marks are caught even if the model misses them

use once_cell::sync::Lazy;
use quillforge_core::eval::{Issue, IssueSeverity};
use regex::Regex;

const EM_DASH: char = '\u{2014}';

/// Case-insensitive, word-bounded list of copy that reads as clickbait rather
/// than the house brand voice.
const SENSATIONAL_WORDS: &[&str] = &[
    "amazing",
    "incredible",
    "unbelievable",
    "shocking",
    "mind-blowing",
    "jaw-dropping",
    "insane",
    "you won't believe",
    "secret they don't want you to know",
];

static SENSATIONAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = SENSATIONAL_WORDS
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
});

/// Scan `text` for banned marks and return one `Issue` per distinct pattern
/// found (not one per occurrence — the QA agent surfaces the kind of problem,
/// the writer agent fixes every occurrence).
#[must_use]
pub fn scan(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    if contains_emoji(text) {
        issues.push(Issue::new(
            "prohibited_pattern",
            IssueSeverity::Critical,
            "output contains emoji characters",
            "remove all emoji from the article body",
        ));
    }

    if text.contains(EM_DASH) {
        issues.push(Issue::new(
            "prohibited_pattern",
            IssueSeverity::High,
            "output contains em dash characters",
            "rewrite using commas, periods, or parentheses instead of em dashes",
        ));
    }

    if let Some(m) = SENSATIONAL_PATTERN.find(text) {
        issues.push(
            Issue::new(
                "prohibited_pattern",
                IssueSeverity::Medium,
                "output contains sensational clickbait language",
                "replace sensational phrasing with a measured, factual tone",
            )
            .with_location(m.as_str().to_string()),
        );
    }

    issues
}

/// Whether `text` contains any character in the common emoji Unicode blocks.
/// Covers emoticons, misc symbols/pictographs, transport symbols, supplemental
/// symbols, and the dingbats range used for things like check/cross marks.
fn contains_emoji(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        matches!(cp,
            0x1F300..=0x1F5FF
            | 0x1F600..=0x1F64F
            | 0x1F680..=0x1F6FF
            | 0x1F900..=0x1F9FF
            | 0x1FA70..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_has_no_issues() {
        assert!(scan("A calm, factual sentence about coffee makers.").is_empty());
    }

    #[test]
    fn flags_emoji_as_critical() {
        let issues = scan("This coffee maker is great! \u{1F525}");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Critical);
    }

    #[test]
    fn flags_em_dash_as_high() {
        let issues = scan("The best coffee maker \u{2014} hands down.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::High);
    }

    #[test]
    fn flags_sensational_language_as_medium() {
        let issues = scan("This SHOCKING trick will change how you brew coffee.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Medium);
    }

    #[test]
    fn does_not_flag_substrings_of_sensational_words() {
        assert!(scan("The insanity defense is a legal concept.").is_empty());
    }

    #[test]
    fn accumulates_distinct_findings() {
        let issues = scan("SHOCKING news \u{2014} right? \u{1F631}");
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn same_finding_category_fingerprints_identically_across_calls() {
        let a = scan("unbelievable results \u{2014}");
        let b = scan("Unbelievable   results \u{2014}");
        let em_dash_a = a.iter().find(|i| i.severity == IssueSeverity::High).unwrap();
        let em_dash_b = b.iter().find(|i| i.severity == IssueSeverity::High).unwrap();
        assert_eq!(em_dash_a.issue_id, em_dash_b.issue_id);
    }
}
