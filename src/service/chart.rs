//! Risk chart URL construction
//!
//! The chart image is not fetched here: the URL is embedded in the report and
//! loaded by the PDF renderer.

use serde_json::json;

use crate::model::{MAX_SCORE, RiskScores, Severity};

/// Encode a bar chart of the five risk scores into a chart-service URL
///
/// Pure and deterministic: object keys serialize in sorted order, so equal
/// scores always produce the same string.
pub fn build_risk_chart_url(base_url: &str, scores: &RiskScores) -> String {
    let entries = scores.entries();

    let labels: Vec<&str> = entries.iter().map(|(hazard, _)| hazard.label()).collect();
    let values: Vec<u8> = entries.iter().map(|(_, score)| *score).collect();
    let colors: Vec<&str> = entries
        .iter()
        .map(|(_, score)| Severity::from_score(*score).color())
        .collect();

    let chart = json!({
        "type": "bar",
        "data": {
            "labels": labels,
            "datasets": [{
                "label": "Risk score",
                "data": values,
                "backgroundColor": colors,
            }],
        },
        "options": {
            "legend": { "display": false },
            "scales": {
                "yAxes": [{ "ticks": { "min": 0, "max": MAX_SCORE, "stepSize": 1 } }],
            },
        },
    });

    format!("{}?c={}", base_url, urlencoding::encode(&chart.to_string()))
}
