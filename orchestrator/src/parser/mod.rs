//! ResponseParser - tolerant JSON extraction from raw assistant text
//!
//! Grounded on the teacher's `parse_decomposition_response` fallback chain
//! in `src/planning/decomposer.rs` (try the strict shape, then degrade),
//! generalized to the four-tier repair ladder this pipeline needs.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Output of `ResponseParser::parse`: a best-effort JSON object plus a
/// confidence hint the caller can use to decide whether to trust it.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub value: Value,
    pub confidence: f32,
    pub fallback_parsed: bool,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\s*```(?:json)?\s*\n?(.*?)\n?\s*```\s*$").unwrap())
}

fn unquoted_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)").unwrap())
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap())
}

/// Never fails: always returns a `ParsedResponse`, degrading confidence as
/// it falls back through progressively looser strategies.
pub fn parse(raw: &str) -> ParsedResponse {
    let stripped = strip_code_fence(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&stripped) {
        return ParsedResponse { value, confidence: 1.0, fallback_parsed: false };
    }

    let repaired = repair_json(&stripped);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return ParsedResponse { value, confidence: 0.7, fallback_parsed: false };
    }

    if let Some(candidate) = largest_object_substring(&stripped) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            return ParsedResponse { value, confidence: 0.5, fallback_parsed: false };
        }
        let repaired_candidate = repair_json(&candidate);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired_candidate) {
            return ParsedResponse { value, confidence: 0.4, fallback_parsed: false };
        }
    }

    ParsedResponse { value: keyword_probe(&stripped), confidence: 0.2, fallback_parsed: true }
}

fn strip_code_fence(raw: &str) -> String {
    if let Some(captures) = fence_re().captures(raw.trim()) {
        captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_else(|| raw.to_string())
    } else {
        raw.trim().to_string()
    }
}

/// Tier 2: quote unquoted keys, normalize quotes, drop trailing commas,
/// then close any unbalanced braces/brackets by counting.
fn repair_json(text: &str) -> String {
    let quoted_keys = unquoted_key_re().replace_all(text, "$1\"$2\"$3");
    let normalized_quotes = quoted_keys.replace('\'', "\"");
    let no_trailing_commas = trailing_comma_re().replace_all(&normalized_quotes, "$1");

    let mut depth_braces = 0i32;
    let mut depth_brackets = 0i32;
    for ch in no_trailing_commas.chars() {
        match ch {
            '{' => depth_braces += 1,
            '}' => depth_braces -= 1,
            '[' => depth_brackets += 1,
            ']' => depth_brackets -= 1,
            _ => {}
        }
    }

    let mut closed = no_trailing_commas.into_owned();
    for _ in 0..depth_brackets.max(0) {
        closed.push(']');
    }
    for _ in 0..depth_braces.max(0) {
        closed.push('}');
    }
    closed
}

/// Tier 3: find the largest balanced `{...}` span in the text
fn largest_object_substring(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut stack = Vec::new();

    for (idx, &byte) in bytes.iter().enumerate() {
        match byte {
            b'{' => stack.push(idx),
            b'}' => {
                if let Some(start) = stack.pop() {
                    if stack.is_empty() {
                        let span = (start, idx);
                        let better = best.map(|(s, e)| (idx - start) > (e - s)).unwrap_or(true);
                        if better {
                            best = Some(span);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(start, end)| text[start..=end].to_string())
}

const MODE_TOKENS: &[(&str, &str)] = &[("chat", "chat"), ("task", "task"), ("dev", "dev")];
const SERVER_TOKENS: &[&str] = &["filesystem", "shell", "browser", "memory"];

/// Tier 4: regex-scan for known vocabulary and synthesize a minimal object
fn keyword_probe(text: &str) -> Value {
    let lower = text.to_lowercase();
    let mut object = serde_json::Map::new();
    object.insert("_fallbackParsed".to_string(), Value::Bool(true));

    for (token, mode) in MODE_TOKENS {
        if lower.contains(token) {
            object.insert("mode".to_string(), Value::String(mode.to_string()));
            break;
        }
    }

    let servers: Vec<Value> = SERVER_TOKENS.iter().filter(|s| lower.contains(**s)).map(|s| Value::String(s.to_string())).collect();
    if !servers.is_empty() {
        object.insert("selected_servers".to_string(), Value::Array(servers));
    }

    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses_at_full_confidence() {
        let result = parse(r#"{"mode": "chat", "confidence": 0.9}"#);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.fallback_parsed);
        assert_eq!(result.value["mode"], "chat");
    }

    #[test]
    fn strips_code_fence_before_parsing() {
        let result = parse("```json\n{\"mode\": \"task\"}\n```");
        assert_eq!(result.value["mode"], "task");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn repairs_unquoted_keys_and_trailing_commas() {
        let result = parse(r#"{mode: "task", confidence: 0.8,}"#);
        assert_eq!(result.value["mode"], "task");
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn completes_missing_closing_brace() {
        let result = parse(r#"{"mode": "task""#);
        assert_eq!(result.value["mode"], "task");
    }

    #[test]
    fn extracts_largest_object_from_surrounding_prose() {
        let result = parse(r#"Sure, here you go: {"mode": "chat"} - hope that helps!"#);
        assert_eq!(result.value["mode"], "chat");
    }

    #[test]
    fn falls_back_to_keyword_probe_on_total_garbage() {
        let result = parse("I think this looks like a task to create a folder with the filesystem server");
        assert!(result.fallback_parsed);
        assert_eq!(result.value["mode"], "task");
        assert_eq!(result.value["selected_servers"][0], "filesystem");
    }
}
