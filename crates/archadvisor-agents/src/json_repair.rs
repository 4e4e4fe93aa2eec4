//! Recovery passes for model-generated JSON.
//!
//! Agents answer with JSON, but the transport hands back whatever the model
//! wrote: fenced blocks, trailing commas, prose before or after the object.
//! Recovery is ordered and idempotent: strip fences, direct parse, fix
//! trailing commas, then extract the first brace-balanced object.

use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use serde_json::Value;

pub fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Remove trailing commas before a closing brace or bracket.
pub fn fix_trailing_commas(text: &str) -> String {
    static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_COMMA.get_or_init(|| Regex::new(r",\s*([}\]])").unwrap());
    re.replace_all(text, "$1").into_owned()
}

/// First complete `{...}` object in the text, tracking brace depth outside of
/// strings and honouring escapes.
pub fn extract_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match byte {
            b'\\' => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Full recovery pipeline. Propagates a parse fault only after every pass
/// has failed.
pub fn extract_json(raw: &str) -> anyhow::Result<Value> {
    let cleaned = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str(cleaned) {
        return Ok(value);
    }
    tracing::warn!("json parse failed on cleaned output; trying comma repair");

    if let Ok(value) = serde_json::from_str(&fix_trailing_commas(cleaned)) {
        tracing::info!(method = "fix_trailing_commas", "json_parse_recovered");
        return Ok(value);
    }

    if let Some(candidate) = extract_balanced_object(cleaned) {
        if let Ok(value) = serde_json::from_str(&fix_trailing_commas(candidate)) {
            tracing::info!(method = "extract_balanced_object", "json_parse_recovered");
            return Ok(value);
        }
    }

    tracing::error!(
        response_length = raw.len(),
        preview = cleaned.chars().take(200).collect::<String>(),
        "json parse failed after all recovery passes"
    );
    serde_json::from_str(cleaned).context("agent output is not parseable JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_clean_json_directly() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn strips_fenced_blocks() {
        let value = extract_json("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
        let value = extract_json("```\n{\"a\": 2}\n```").unwrap();
        assert_eq!(value, json!({"a": 2}));
    }

    #[test]
    fn repairs_trailing_commas() {
        let value = extract_json(r#"{"items": [1, 2, 3,], "a": 1,}"#).unwrap();
        assert_eq!(value, json!({"items": [1, 2, 3], "a": 1}));
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Here is the design you asked for:\n{\"a\": {\"b\": 2}}\nLet me know!";
        let value = extract_json(raw).unwrap();
        assert_eq!(value, json!({"a": {"b": 2}}));
    }

    #[test]
    fn brace_walk_ignores_braces_inside_strings() {
        let raw = r#"prefix {"text": "a } inside", "n": 1} suffix"#;
        assert_eq!(
            extract_balanced_object(raw).unwrap(),
            r#"{"text": "a } inside", "n": 1}"#
        );
    }

    #[test]
    fn brace_walk_honours_escaped_quotes() {
        let raw = r#"{"text": "she said \"}\"", "n": 1}"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn combined_fences_prose_and_commas_recover() {
        let raw = "```json\nSure thing: {\"a\": [1,2,],\"b\": \"x\",}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": "x"}));
    }

    #[test]
    fn recovery_is_idempotent() {
        let raw = r#"{"a": [1,2,],}"#;
        let once = fix_trailing_commas(raw);
        let twice = fix_trailing_commas(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn hopeless_input_propagates_a_fault() {
        assert!(extract_json("no json here at all").is_err());
        assert!(extract_json("{ \"unterminated\": ").is_err());
    }
}
