//! Reply normalisation: strip Markdown wrapping and parse the JSON payload.
//!
//! Models asked for "ONLY valid JSON" still wrap the answer in a code fence
//! more often than not. Three deterministic string rules undo that:
//!
//! 1. Drop a leading fence with a language tag (` ```json `)
//! 2. Drop a leading bare fence (` ``` `)
//! 3. Drop a trailing bare fence
//!
//! after which the remainder is trimmed and handed to `serde_json`. There is
//! no brace balancing or partial recovery: a reply that still fails to parse
//! is reported as [`CourseError::MalformedModelOutput`] together with the
//! raw reply.

use crate::error::CourseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const FENCE: &str = "```";

static RE_OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z][A-Za-z0-9_+-]*").unwrap());

/// Parse a raw model reply into a structured value.
pub fn normalize(raw_reply: &str) -> Result<Value, CourseError> {
    let cleaned = strip_code_fences(raw_reply);
    serde_json::from_str(cleaned).map_err(|e| CourseError::MalformedModelOutput {
        reason: format!("reply is not valid JSON after fence stripping: {e}"),
        raw: raw_reply.to_string(),
    })
}

/// Remove Markdown code fences around a reply and trim whitespace.
///
/// Text without fences comes back trimmed and otherwise unchanged.
pub fn strip_code_fences(input: &str) -> &str {
    let mut s = input.trim();

    // Rule 1: fence with language tag
    if let Some(m) = RE_OPENING_FENCE.find(s) {
        s = &s[m.end()..];
    }
    // Rule 2: bare fence
    if let Some(rest) = s.strip_prefix(FENCE) {
        s = rest;
    }
    // Rule 3: trailing fence
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest;
    }

    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fences_json_tag() {
        let input = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "  {\"a\": 1}\n";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
        assert_eq!(strip_code_fences(strip_code_fences(input)), "{\"a\": 1}");
    }

    #[test]
    fn test_other_language_tag() {
        assert_eq!(strip_code_fences("```JSON\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```javascript\n[1]```"), "[1]");
    }

    #[test]
    fn test_fence_without_newline() {
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn fenced_reply_parses_like_bare_reply() {
        let body = r#"{"title": "T", "units": [{"title": "U"}]}"#;
        let fenced = format!("```json\n{body}\n```");
        assert_eq!(normalize(&fenced).unwrap(), normalize(body).unwrap());
        assert_eq!(
            normalize(body).unwrap(),
            json!({"title": "T", "units": [{"title": "U"}]})
        );
    }

    #[test]
    fn truncated_json_is_malformed() {
        let raw = "```json\n{\"title\": \"T\", \"units\": [\n```";
        let err = normalize(raw).unwrap_err();
        match err {
            CourseError::MalformedModelOutput { raw: kept, .. } => assert_eq!(kept, raw),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn prose_is_malformed() {
        let raw = "I'm sorry, I can't help with that document.";
        assert!(matches!(
            normalize(raw),
            Err(CourseError::MalformedModelOutput { .. })
        ));
    }

    #[test]
    fn chatty_preamble_is_not_recovered() {
        let raw = "Here is your course:\n```json\n{\"a\": 1}\n```";
        assert!(normalize(raw).is_err());
    }
}
