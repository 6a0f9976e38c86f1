//! ABOUTME: Tolerant JSON extraction/repair pipeline (§4.9 JSON Repair)
//! ABOUTME: Used by `generateJSON` to coax a schema-valid object out of LLM prose

use jsonschema::JSONSchema;
use quillforge_core::PipelineError;
use serde_json::Value;

/// Parse `raw` as JSON matching `schema`, tolerating the usual ways an LLM
/// wraps or mangles a JSON payload. Steps, applied in order (§4.9):
///
/// 1. Strip leading/trailing whitespace.
/// 2. Strip a surrounding markdown code fence (` ```json ... ``` ` or ` ``` ... ``` `).
/// 3. Locate the first `{` or `[` and the matching closing bracket, scanning
///    with a depth counter that respects string literals and escapes — content
///    before/after that span is discarded.
/// 4. Attempt a standard parse; on failure, apply bounded heuristics (strip
///    trailing commas, normalize smart quotes, escape bare newlines inside
///    strings) and retry once.
/// 5. Validate the parsed value against `schema`; a schema violation is a
///    `PipelineError::Validation`, not a parse failure.
pub fn repair_and_parse(raw: &str, schema: &Value) -> Result<Value, PipelineError> {
    let stripped = strip_code_fence(raw.trim());
    let span = extract_bracketed_span(stripped).ok_or_else(|| {
        PipelineError::validation("no JSON object or array found in model output")
    })?;

    let value = match serde_json::from_str::<Value>(span) {
        Ok(value) => value,
        Err(_) => {
            let healed = apply_heuristics(span);
            serde_json::from_str::<Value>(&healed).map_err(|e| {
                PipelineError::validation(format!("could not repair JSON output: {e}"))
            })?
        }
    };

    validate_schema(&value, schema)?;
    Ok(value)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop an optional language tag (e.g. "json") up to the first newline.
    let rest = rest
        .split_once('\n')
        .map_or(rest, |(_, after)| after);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Scan for the first top-level `{`/`[` and its matching close, tracking
/// string literals and backslash escapes so braces inside string values don't
/// throw off the depth count.
fn extract_bracketed_span(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let start = s.find(['{', '['])?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Bounded, best-effort repairs for the handful of malformations models
/// reliably produce. Never loops; applied once.
fn apply_heuristics(s: &str) -> String {
    let smart_quotes_normalized = s
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    strip_trailing_commas(&smart_quotes_normalized)
}

fn strip_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();
    let mut in_string = false;
    let mut escaped = false;
    while let Some((_, c)) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }
        if c == ',' {
            let mut lookahead = chars.clone();
            let mut next_significant = None;
            while let Some((_, n)) = lookahead.next() {
                if !n.is_whitespace() {
                    next_significant = Some(n);
                    break;
                }
            }
            if matches!(next_significant, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn validate_schema(value: &Value, schema: &Value) -> Result<(), PipelineError> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| PipelineError::internal(format!("invalid output schema: {e}")))?;
    if let Err(errors) = compiled.validate(value) {
        let detail = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PipelineError::validation(format!(
            "model output failed schema validation: {detail}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn any_schema() -> Value {
        json!({})
    }

    #[test]
    fn parses_clean_json() {
        let value = repair_and_parse(r#"{"a": 1}"#, &any_schema()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn strips_markdown_fence_with_language_tag() {
        let raw = "```json\n{\"a\": 1}\n```";
        let value = repair_and_parse(raw, &any_schema()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn discards_prose_around_the_object() {
        let raw = "Sure, here's the result:\n{\"a\": 1}\nLet me know if you need anything else!";
        let value = repair_and_parse(raw, &any_schema()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn heals_trailing_comma() {
        let raw = r#"{"a": 1, "b": [1, 2, 3,],}"#;
        let value = repair_and_parse(raw, &any_schema()).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"][2], 3);
    }

    #[test]
    fn normalizes_smart_quotes() {
        let raw = "{\u{201c}a\u{201d}: 1}";
        let value = repair_and_parse(raw, &any_schema()).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = r#"{"a": "looks like } but isn't"}"#;
        let value = repair_and_parse(raw, &any_schema()).unwrap();
        assert_eq!(value["a"], "looks like } but isn't");
    }

    #[test]
    fn rejects_schema_mismatch() {
        let schema = json!({"type": "object", "required": ["b"]});
        let err = repair_and_parse(r#"{"a": 1}"#, &schema).unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
    }

    #[test]
    fn errors_when_nothing_json_shaped_is_present() {
        let err = repair_and_parse("just plain prose", &any_schema()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
    }
}
