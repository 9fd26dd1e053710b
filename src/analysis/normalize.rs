//! Coerce loosely-typed model output into the strict report schema.
//!
//! The model is asked for JSON but frequently wraps it in prose or Markdown
//! fences. Everything is resolved here, once, into `AnalysisResult`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::AnalysisError;
use crate::report::types::{AnalysisResult, Finding, Severity};

const UNTITLED_FINDING: &str = "Untitled finding";

/// Raw reply from the analysis service before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnalysisPayload {
    /// Free text that may contain a JSON object somewhere inside it
    Text(String),
    /// An already-decoded JSON value
    Structured(Value),
}

impl RawAnalysisPayload {
    /// Classify a model reply: a reply that is already a bare JSON document is
    /// decoded up front, anything else is kept as text for extraction.
    pub fn from_reply(reply: String) -> Self {
        match serde_json::from_str::<Value>(reply.trim()) {
            Ok(value) => RawAnalysisPayload::Structured(value),
            Err(_) => RawAnalysisPayload::Text(reply),
        }
    }
}

/// Reply of the parser validation prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    /// Coverage estimate in [0, 100]
    pub test_coverage: f64,
}

/// Normalize a raw payload into an `AnalysisResult`.
///
/// Requires a string `summary` and a numeric `score`; everything else is
/// optional and coerced.
pub fn normalize(payload: RawAnalysisPayload) -> Result<AnalysisResult, AnalysisError> {
    let value = resolve(payload)?;
    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Malformed("analysis payload is not a JSON object".to_string()))?;

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::Malformed("missing string field 'summary'".to_string()))?
        .trim()
        .to_string();

    let score = object
        .get("score")
        .and_then(number_like)
        .ok_or_else(|| AnalysisError::Malformed("missing numeric field 'score'".to_string()))?;
    if !score.is_finite() {
        return Err(AnalysisError::Malformed(format!("score is not finite: {score}")));
    }
    let clamped = score.clamp(0.0, 100.0);
    if clamped != score {
        warn!(score, clamped, "score outside [0, 100], clamping");
    }

    let findings = match object.get("findings") {
        Some(Value::Array(entries)) => entries.iter().filter_map(normalize_finding).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(kind = %kind_of(other), "'findings' is not an array, ignoring");
            Vec::new()
        }
    };

    let recommendations = string_list(object.get("recommendations"));
    debug!(findings = findings.len(), recommendations = recommendations.len(), score = clamped, "normalized analysis");

    Ok(AnalysisResult {
        summary,
        score: clamped,
        findings,
        recommendations,
    })
}

/// Normalize the reply to a parser validation prompt.
pub fn normalize_parser_validation(payload: RawAnalysisPayload) -> Result<ParserValidation, AnalysisError> {
    let value = resolve(payload)?;
    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Malformed("parser validation is not a JSON object".to_string()))?;

    let is_valid = match object.get("is_valid").and_then(Value::as_bool) {
        Some(is_valid) => is_valid,
        None => {
            warn!("parser validation has no boolean 'is_valid', treating as invalid");
            false
        }
    };

    Ok(ParserValidation {
        is_valid,
        issues: string_list(object.get("issues")),
        suggestions: string_list(object.get("suggestions")),
        test_coverage: object
            .get("test_coverage")
            .and_then(number_like)
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 100.0))
            .unwrap_or(0.0),
    })
}

/// Extract `- item` / `* item` bullets from a Markdown list reply.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Span from the first `{` to the last `}`, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn resolve(payload: RawAnalysisPayload) -> Result<Value, AnalysisError> {
    match payload {
        RawAnalysisPayload::Structured(value) => Ok(value),
        RawAnalysisPayload::Text(text) => {
            let unfenced = strip_code_fences(&text);
            let json = extract_json(&unfenced)
                .ok_or_else(|| AnalysisError::Malformed("no JSON object found in response text".to_string()))?;
            serde_json::from_str(json).map_err(|e| AnalysisError::Malformed(format!("invalid JSON in response: {e}")))
        }
    }
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_finding(entry: &Value) -> Option<Finding> {
    match entry {
        Value::Object(fields) => Some(finding_from_object(fields)),
        Value::String(title) => Some(Finding {
            title: title.trim().to_string(),
            severity: Severity::Medium,
            description: String::new(),
            file: None,
        }),
        other => {
            warn!(kind = %kind_of(other), "skipping finding entry that is neither object nor string");
            None
        }
    }
}

fn finding_from_object(fields: &Map<String, Value>) -> Finding {
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    Finding {
        title: text("title")
            .or_else(|| text("area"))
            .unwrap_or(UNTITLED_FINDING)
            .to_string(),
        severity: text("severity")
            .map(Severity::parse_lenient)
            .unwrap_or(Severity::Medium),
        description: text("description").unwrap_or_default().to_string(),
        file: text("file").map(str::to_string),
    }
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_payload() {
        let payload = RawAnalysisPayload::Structured(json!({
            "summary": "Solid pipeline",
            "score": 85.5,
            "findings": [{
                "title": "Error Handling",
                "severity": "medium",
                "description": "Missing try-catch in OCR pipeline",
                "file": "ace/extraction/ocr.py"
            }],
            "recommendations": ["Add retries"]
        }));
        let result = normalize(payload).unwrap();
        assert_eq!(result.score, 85.5);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Error Handling");
        assert_eq!(result.findings[0].severity, Severity::Medium);
        assert_eq!(result.findings[0].file.as_deref(), Some("ace/extraction/ocr.py"));
        assert_eq!(result.recommendations, vec!["Add retries"]);
    }

    #[test]
    fn test_text_payload_with_fences_and_prose() {
        let text = "Here is my analysis:\n```json\n{\"summary\": \"ok\", \"score\": 70, \"findings\": []}\n```\nThanks!";
        let result = normalize(RawAnalysisPayload::Text(text.to_string())).unwrap();
        assert_eq!(result.summary, "ok");
        assert_eq!(result.score, 70.0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_fixture_payload() {
        let text = include_str!("../../tests/fixtures/sample_analysis.json");
        let result = normalize(RawAnalysisPayload::Text(text.to_string())).unwrap();
        assert_eq!(result.findings.len(), 4);
        assert_eq!(result.recommendations.len(), 3);
    }

    #[test]
    fn test_finding_count_matches_entries_including_duplicates() {
        let finding = json!({"title": "Dup", "severity": "low", "description": "same"});
        let payload = json!({
            "summary": "s",
            "score": 50,
            "findings": [finding.clone(), finding.clone(), finding]
        });
        let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
        assert_eq!(result.findings.len(), 3);
        assert_eq!(result.findings[0], result.findings[2]);
    }

    #[test]
    fn test_unknown_severity_becomes_medium() {
        for raw in ["critical", "BLOCKER", "", "info"] {
            let payload = json!({
                "summary": "s",
                "score": 10,
                "findings": [{"title": "t", "severity": raw, "description": "d"}]
            });
            let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
            assert_eq!(result.findings[0].severity, Severity::Medium, "severity {raw:?}");
        }
    }

    #[test]
    fn test_non_string_severity_becomes_medium() {
        let payload = json!({
            "summary": "s",
            "score": 10,
            "findings": [{"title": "t", "severity": 3}]
        });
        let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
        assert_eq!(result.findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_area_fallback_and_missing_file() {
        let payload = json!({
            "summary": "s",
            "score": 10,
            "findings": [{"area": "Performance", "severity": "HIGH", "description": "slow", "file": ""}]
        });
        let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
        assert_eq!(result.findings[0].title, "Performance");
        assert_eq!(result.findings[0].severity, Severity::High);
        assert!(result.findings[0].file.is_none());
    }

    #[test]
    fn test_string_and_invalid_finding_entries() {
        let payload = json!({
            "summary": "s",
            "score": 10,
            "findings": ["Plain finding", null, 42]
        });
        let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title, "Plain finding");
    }

    #[test]
    fn test_missing_summary_is_malformed() {
        let payload = json!({"score": 10});
        assert!(matches!(
            normalize(RawAnalysisPayload::Structured(payload)),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_score_is_malformed() {
        let payload = json!({"summary": "s", "score": "high"});
        assert!(matches!(
            normalize(RawAnalysisPayload::Structured(payload)),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn test_plain_text_is_malformed() {
        let payload = RawAnalysisPayload::Text("I could not analyze this project.".to_string());
        assert!(matches!(normalize(payload), Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        let payload = RawAnalysisPayload::Structured(json!([1, 2, 3]));
        assert!(matches!(normalize(payload), Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn test_score_string_and_clamping() {
        let payload = json!({"summary": "s", "score": "42.5"});
        assert_eq!(normalize(RawAnalysisPayload::Structured(payload)).unwrap().score, 42.5);

        let payload = json!({"summary": "s", "score": 140});
        assert_eq!(normalize(RawAnalysisPayload::Structured(payload)).unwrap().score, 100.0);

        let payload = json!({"summary": "s", "score": -3});
        assert_eq!(normalize(RawAnalysisPayload::Structured(payload)).unwrap().score, 0.0);
    }

    #[test]
    fn test_recommendations_coercion() {
        let payload = json!({
            "summary": "s",
            "score": 1,
            "recommendations": ["a", null, 3, "  "]
        });
        let result = normalize(RawAnalysisPayload::Structured(payload)).unwrap();
        assert_eq!(result.recommendations, vec!["a", "3"]);
    }

    #[test]
    fn test_parser_validation() {
        let text = "```json\n{\"is_valid\": false, \"issues\": [\"no tests\"], \"suggestions\": [], \"test_coverage\": 35}\n```";
        let validation = normalize_parser_validation(RawAnalysisPayload::Text(text.to_string())).unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.issues, vec!["no tests"]);
        assert_eq!(validation.test_coverage, 35.0);
    }

    #[test]
    fn test_parser_validation_without_flag_is_invalid() {
        let payload = RawAnalysisPayload::Structured(json!({
            "issues": ["empty input crashes"],
            "suggestions": ["guard empty pages"]
        }));
        let validation = normalize_parser_validation(payload).unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.issues, vec!["empty input crashes"]);
        assert_eq!(validation.suggestions, vec!["guard empty pages"]);
        assert_eq!(validation.test_coverage, 0.0);
    }

    #[test]
    fn test_parser_validation_still_needs_an_object() {
        let payload = RawAnalysisPayload::Structured(json!(["is_valid"]));
        assert!(matches!(
            normalize_parser_validation(payload),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn test_payload_from_reply() {
        assert_eq!(
            RawAnalysisPayload::from_reply(" {\"score\": 1} \n".to_string()),
            RawAnalysisPayload::Structured(json!({"score": 1}))
        );
        let fenced = "```json\n{\"score\": 1}\n```".to_string();
        assert_eq!(
            RawAnalysisPayload::from_reply(fenced.clone()),
            RawAnalysisPayload::Text(fenced)
        );
    }

    #[test]
    fn test_parse_suggestions() {
        let text = "Suggestions:\n- Use pathlib\n  - Add type hints\n* Log errors\n-\nplain line";
        assert_eq!(
            parse_suggestions(text),
            vec!["Use pathlib", "Add type hints", "Log errors"]
        );
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("nothing"), None);
    }
}
