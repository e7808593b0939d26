//! Model response parser
//!
//! Extracts a structured result from the model's raw text. Strategies are an
//! ordered list, tried in sequence: strict JSON (after stripping code fences),
//! then a regex rescue that pulls the first bracketed array literal out of
//! otherwise unusable text. The history-mode emergency fallback lives in the
//! pipeline since it needs a fresh store query, not the raw text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::core::error::PipelineError;

static ARRAY_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").expect("array literal pattern must compile"));

/// Structured result extracted from model output. Transient, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub recommended_ids: Vec<i64>,
    pub playlist_name: Option<String>,
    pub playlist_description: Option<String>,
    pub explanation: Option<String>,
}

/// Why one parse strategy failed (internal, strategies only)
#[derive(Debug)]
enum ParseError {
    NotJson,
    MissingIds,
}

type Strategy = fn(&str) -> Result<ModelResponse, ParseError>;

/// The strategy ladder, in priority order
const STRATEGIES: &[Strategy] = &[parse_strict_json, parse_bracketed_array];

/// Parse the aggregated model text, trying each strategy in order.
pub fn parse_model_response(text: &str) -> Result<ModelResponse, PipelineError> {
    let cleaned = strip_code_fences(text);

    for strategy in STRATEGIES {
        match strategy(&cleaned) {
            Ok(response) => return Ok(response),
            Err(err) => debug!("parse strategy failed: {:?}", err),
        }
    }

    debug!("unparseable model output: {}", text);
    Err(PipelineError::ParseFailure)
}

/// Remove a wrapping markdown code fence (``` or ```json) if present
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // drop an optional language tag on the fence line
        let rest = match rest.split_once('\n') {
            Some((first_line, body)) if first_line.trim().chars().all(|c| c.is_alphanumeric()) => {
                body
            }
            _ => rest,
        };
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Strategy 1: the whole document is the expected JSON object
fn parse_strict_json(text: &str) -> Result<ModelResponse, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ParseError::NotJson)?;

    let obj = value.as_object().ok_or(ParseError::MissingIds)?;

    let ids = ["trackIds", "suggestedTrackIds", "recommendedIds"]
        .iter()
        .find_map(|field| obj.get(*field))
        .and_then(|v| v.as_array())
        .map(|arr| collect_ids(arr))
        .ok_or(ParseError::MissingIds)?;

    Ok(ModelResponse {
        recommended_ids: ids,
        playlist_name: string_field(obj, "playlistName"),
        playlist_description: string_field(obj, "playlistDescription"),
        explanation: string_field(obj, "explanation"),
    })
}

/// Strategy 2: rescue the first bracketed array literal as a plain ID list
fn parse_bracketed_array(text: &str) -> Result<ModelResponse, ParseError> {
    let matched = ARRAY_LITERAL.find(text).ok_or(ParseError::NotJson)?;

    let value: Value = serde_json::from_str(matched.as_str()).map_err(|_| ParseError::NotJson)?;
    let arr = value.as_array().ok_or(ParseError::NotJson)?;

    let ids = collect_ids(arr);
    if ids.is_empty() && !arr.is_empty() {
        // the array held something, but nothing id-like
        return Err(ParseError::MissingIds);
    }

    Ok(ModelResponse {
        recommended_ids: ids,
        ..Default::default()
    })
}

/// Accept ids as JSON numbers or as numeric strings ("42")
fn collect_ids(arr: &[Value]) -> Vec<i64> {
    arr.iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .collect()
}

fn string_field(obj: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_clean_json() {
        let text = r#"{"trackIds": [3, 1, 2], "playlistName": "Chill", "playlistDescription": "Slow evenings"}"#;
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![3, 1, 2]);
        assert_eq!(response.playlist_name.as_deref(), Some("Chill"));
        assert_eq!(
            response.playlist_description.as_deref(),
            Some("Slow evenings")
        );
    }

    #[test]
    fn test_parses_fenced_json() {
        let text = "```json\n{\"trackIds\": [5], \"playlistName\": \"X\"}\n```";
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![5]);
    }

    #[test]
    fn test_parses_suggestion_field() {
        let text = r#"{"suggestedTrackIds": [9, 8]}"#;
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![9, 8]);
    }

    #[test]
    fn test_accepts_string_ids() {
        let text = r#"{"trackIds": ["7", "11", "not-an-id"]}"#;
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![7, 11]);
    }

    #[test]
    fn test_empty_id_list_is_valid() {
        // "nothing matched" responses carry an empty list plus an explanation
        let text = r#"{"trackIds": [], "playlistName": "No matches", "playlistDescription": "Nothing in the catalog fits"}"#;
        let response = parse_model_response(text).unwrap();
        assert!(response.recommended_ids.is_empty());
        assert_eq!(response.playlist_name.as_deref(), Some("No matches"));
    }

    #[test]
    fn test_array_rescue_from_prose() {
        let text = "Here are my picks!\nI went with [12, 4, 7] because they fit the mood.";
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![12, 4, 7]);
        assert!(response.playlist_name.is_none());
    }

    #[test]
    fn test_array_rescue_from_wrong_shape_json() {
        // parses as JSON but lacks the expected id field
        let text = r#"{"songs": [3, 9], "note": "enjoy"}"#;
        let response = parse_model_response(text).unwrap();
        assert_eq!(response.recommended_ids, vec![3, 9]);
    }

    #[test]
    fn test_unparseable_text_fails() {
        let result = parse_model_response("I'm sorry, I can't help with that.");
        assert!(matches!(result, Err(PipelineError::ParseFailure)));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }
}
