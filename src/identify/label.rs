//! Identification response parsing
//!
//! The service answers with JSON. On a match, `result[0]` carries a label
//! shaped like `{name, rollNumber}`; every other shape means no match.

use crate::attendance::state::SubmissionResult;
use crate::utils::error::{AttendanceError, AttendanceResult};
use serde_json::Value;

/// Field names that may carry the label inside `result[0]`
const LABEL_FIELDS: &[&str] = &["_label", "label"];

/// Characters stripped from a label before splitting
const LABEL_NOISE: &[char] = &['{', '}', '"', '\''];

/// Parse a `{name, rollNumber}` label.
///
/// Anything other than exactly two non-empty comma-separated parts is a
/// no-match; this covers `"{}"`, `""` and the service's `"unknown"` label.
pub fn parse_label(label: &str) -> SubmissionResult {
    let cleaned: String = label.chars().filter(|c| !LABEL_NOISE.contains(c)).collect();
    let parts: Vec<&str> = cleaned.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [name, roll_number] if !name.is_empty() && !roll_number.is_empty() => {
            SubmissionResult::Identified {
                name: name.to_string(),
                roll_number: roll_number.to_string(),
            }
        }
        _ => SubmissionResult::NoMatch,
    }
}

/// Parse a response body.
///
/// Bodies that are not JSON fail with `MalformedResponse`; JSON without a
/// usable label is `NoMatch`.
pub fn parse_response(body: &[u8]) -> AttendanceResult<SubmissionResult> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| AttendanceError::MalformedResponse(e.to_string()))?;

    Ok(extract_label(&json)
        .map(parse_label)
        .unwrap_or(SubmissionResult::NoMatch))
}

fn extract_label(json: &Value) -> Option<&str> {
    let first = json.get("result")?.as_array()?.first()?;

    if let Some(label) = first.as_str() {
        return Some(label);
    }

    LABEL_FIELDS
        .iter()
        .find_map(|field| first.get(*field).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identified(name: &str, roll_number: &str) -> SubmissionResult {
        SubmissionResult::Identified {
            name: name.to_string(),
            roll_number: roll_number.to_string(),
        }
    }

    #[test]
    fn test_parse_label_identified() {
        assert_eq!(parse_label("{Alice, 42}"), identified("Alice", "42"));
        assert_eq!(parse_label("{\"Alice\", \"42\"}"), identified("Alice", "42"));
        assert_eq!(parse_label("  {Mary Ann ,  B-07 }  "), identified("Mary Ann", "B-07"));
    }

    #[test]
    fn test_parse_label_no_match() {
        assert_eq!(parse_label("{}"), SubmissionResult::NoMatch);
        assert_eq!(parse_label(""), SubmissionResult::NoMatch);
        assert_eq!(parse_label("unknown"), SubmissionResult::NoMatch);
        assert_eq!(parse_label("{Alice, }"), SubmissionResult::NoMatch);
        assert_eq!(parse_label("{Alice, 42, extra}"), SubmissionResult::NoMatch);
    }

    #[test]
    fn test_parse_response_with_label() {
        let body = br#"{"result":[{"_label":"{Bob, 17}","_distance":0.41}]}"#;
        assert_eq!(parse_response(body).unwrap(), identified("Bob", "17"));

        let body = br#"{"result":[{"label":"{Bob, 17}"}]}"#;
        assert_eq!(parse_response(body).unwrap(), identified("Bob", "17"));

        let body = br#"{"result":["{Bob, 17}"]}"#;
        assert_eq!(parse_response(body).unwrap(), identified("Bob", "17"));
    }

    #[test]
    fn test_parse_response_without_result() {
        assert_eq!(parse_response(b"{}").unwrap(), SubmissionResult::NoMatch);
        assert_eq!(
            parse_response(br#"{"result":[]}"#).unwrap(),
            SubmissionResult::NoMatch
        );
        assert_eq!(
            parse_response(br#"{"result":"none"}"#).unwrap(),
            SubmissionResult::NoMatch
        );
        assert_eq!(
            parse_response(br#"{"result":[{"_label":"unknown"}]}"#).unwrap(),
            SubmissionResult::NoMatch
        );
    }

    #[test]
    fn test_parse_response_malformed() {
        let err = parse_response(b"<html>oops</html>").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_RESPONSE");
    }
}
