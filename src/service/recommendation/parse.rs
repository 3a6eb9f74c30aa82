//! Parsing of model output into an [`AiReport`]

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::model::{AiReport, RiskScores};

/// Matches a response wrapped in a markdown code fence
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\s*```\s*$").expect("valid code fence regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredReport {
    risk_scores: RiskScores,
    report_html: String,
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parse a strict-JSON response carrying `riskScores` and `reportHtml`
pub fn parse_structured_report(text: &str) -> Result<AiReport, String> {
    let body = strip_code_fence(text);

    let parsed: StructuredReport =
        serde_json::from_str(body).map_err(|e| format!("invalid report JSON: {}", e))?;

    parsed.risk_scores.validate()?;

    if parsed.report_html.trim().is_empty() {
        return Err("reportHtml is empty".to_string());
    }

    Ok(AiReport {
        risk_scores: Some(parsed.risk_scores),
        report_html: parsed.report_html,
    })
}

/// Parse a free-form HTML response
pub fn parse_html_report(text: &str) -> Result<AiReport, String> {
    let body = strip_code_fence(text);

    if body.is_empty() {
        return Err("report HTML is empty".to_string());
    }

    Ok(AiReport {
        risk_scores: None,
        report_html: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "riskScores": {"flood": 2, "fire": 9, "wind": 4, "air": 3, "heat": 7},
        "reportHtml": "<h2>Key risks</h2><p>Wildfire season is severe.</p>"
    }"#;

    #[test]
    fn test_parse_valid_structured_report() {
        let report = parse_structured_report(VALID).unwrap();
        let scores = report.risk_scores.unwrap();
        assert_eq!(scores.fire, 9);
        assert_eq!(scores.heat, 7);
        assert!(report.report_html.starts_with("<h2>Key risks"));
    }

    #[test]
    fn test_parse_fenced_structured_report() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_structured_report(&fenced).is_ok());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = parse_structured_report("Here is your plan: <h2>Risks</h2>").unwrap_err();
        assert!(err.contains("invalid report JSON"));
    }

    #[test]
    fn test_missing_keys_are_rejected() {
        let err = parse_structured_report(r#"{"reportHtml": "<p>plan</p>"}"#).unwrap_err();
        assert!(err.contains("riskScores"));

        let err = parse_structured_report(
            r#"{"riskScores": {"flood": 2, "fire": 9, "wind": 4, "air": 3, "heat": 7}}"#,
        )
        .unwrap_err();
        assert!(err.contains("reportHtml"));
    }

    #[test]
    fn test_out_of_range_scores_are_rejected() {
        let err = parse_structured_report(
            r#"{"riskScores": {"flood": 0, "fire": 9, "wind": 4, "air": 3, "heat": 7},
                "reportHtml": "<p>plan</p>"}"#,
        )
        .unwrap_err();
        assert!(err.contains("flood=0"));
    }

    #[test]
    fn test_empty_narrative_is_rejected() {
        let err = parse_structured_report(
            r#"{"riskScores": {"flood": 2, "fire": 9, "wind": 4, "air": 3, "heat": 7},
                "reportHtml": "   "}"#,
        )
        .unwrap_err();
        assert_eq!(err, "reportHtml is empty");
    }

    #[test]
    fn test_parse_html_report() {
        let report = parse_html_report("```html\n<h2>Plan</h2>\n```").unwrap();
        assert_eq!(report.report_html, "<h2>Plan</h2>");
        assert!(report.risk_scores.is_none());

        assert!(parse_html_report("  \n ").is_err());
    }
}
