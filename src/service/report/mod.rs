//! HTML assembly for evacuation plan documents

use chrono::NaiveDate;

use crate::model::{AiReport, HospitalEntry, RiskScores, Severity};

pub mod escape;

pub use escape::SafeHtml;

/// Sentence shown when no facilities are available
pub const NO_FACILITIES_PLACEHOLDER: &str =
    "No nearby medical facilities could be found for this address.";

/// Everything the document template needs
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub address: &'a str,
    pub recipient: &'a str,
    pub generated_on: NaiveDate,
    pub report: &'a AiReport,
    /// Effective scores (caller-supplied or model-produced)
    pub risk_scores: Option<&'a RiskScores>,
    pub chart_url: Option<&'a str>,
    pub facilities: &'a [HospitalEntry],
}

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; color: #2c3e50; margin: 40px; line-height: 1.5; }
header { border-bottom: 3px solid #c0392b; padding-bottom: 12px; margin-bottom: 24px; }
h1 { color: #c0392b; margin: 0 0 4px 0; }
.meta { color: #7f8c8d; font-size: 13px; }
.risk-grid { display: flex; flex-wrap: wrap; gap: 12px; margin: 16px 0; }
.risk-block { flex: 1 1 120px; border-radius: 8px; padding: 12px; text-align: center; color: #fff; }
.risk-block.low { background: #2ecc71; }
.risk-block.medium { background: #f39c12; }
.risk-block.high { background: #e74c3c; }
.risk-icon { font-size: 28px; display: block; }
.risk-name { font-weight: bold; display: block; }
.risk-score { font-size: 22px; display: block; }
.risk-label { text-transform: uppercase; font-size: 12px; letter-spacing: 1px; }
.chart { text-align: center; margin: 24px 0; }
.chart img { max-width: 100%; }
.narrative { margin: 24px 0; }
.facilities li { margin-bottom: 8px; }
footer { margin-top: 40px; font-size: 11px; color: #95a5a6; border-top: 1px solid #ecf0f1; padding-top: 8px; }
"#;

/// Assemble the full HTML document
///
/// Pure: the same context always renders the same document.
pub fn render_html(ctx: &ReportContext<'_>) -> String {
    let address = SafeHtml::escape(ctx.address);
    let recipient = SafeHtml::escape(ctx.recipient);
    let narrative = SafeHtml::trusted(ctx.report.report_html.as_str());

    let risk_section = ctx
        .risk_scores
        .map(render_risk_section)
        .unwrap_or_default();

    let chart_section = ctx
        .chart_url
        .map(|url| {
            format!(
                "<section class=\"chart\"><img src=\"{}\" alt=\"Risk score chart\"></section>\n",
                SafeHtml::escape(url)
            )
        })
        .unwrap_or_default();

    let facilities_section = render_facilities(ctx.facilities);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Evacuation Plan for {address}</title>
<style>{style}</style>
</head>
<body>
<header>
<h1>Personal Evacuation Plan</h1>
<div class="meta">Address: <strong>{address}</strong></div>
<div class="meta">Prepared for {recipient} on {date}</div>
</header>
{risk_section}{chart_section}<section class="narrative">
{narrative}
</section>
<section class="facilities">
<h2>Nearby Medical Facilities</h2>
{facilities_section}
</section>
<footer>This plan is generated automatically and does not replace instructions from local emergency services.</footer>
</body>
</html>
"#,
        address = address,
        style = STYLE,
        recipient = recipient,
        date = ctx.generated_on.format("%B %-d, %Y"),
        risk_section = risk_section,
        chart_section = chart_section,
        narrative = narrative,
        facilities_section = facilities_section,
    )
}

fn render_risk_section(scores: &RiskScores) -> String {
    let blocks: String = scores
        .entries()
        .iter()
        .map(|(hazard, score)| {
            let severity = Severity::from_score(*score);
            format!(
                "<div class=\"risk-block {class}\"><span class=\"risk-icon\">{icon}</span><span class=\"risk-name\">{name}</span><span class=\"risk-score\">{score}/10</span><span class=\"risk-label\">{label}</span></div>\n",
                class = severity.css_class(),
                icon = hazard.icon(),
                name = hazard.label(),
                score = score,
                label = severity.label(),
            )
        })
        .collect();

    format!(
        "<section class=\"risks\">\n<h2>Risk Overview</h2>\n<div class=\"risk-grid\">\n{}</div>\n</section>\n",
        blocks
    )
}

fn render_facilities(facilities: &[HospitalEntry]) -> String {
    if facilities.is_empty() {
        return format!("<p>{}</p>", NO_FACILITIES_PLACEHOLDER);
    }

    let items: String = facilities
        .iter()
        .map(|f| {
            format!(
                "<li><strong>{}</strong><br>{}</li>\n",
                SafeHtml::escape(&f.name),
                SafeHtml::escape(&f.formatted_address)
            )
        })
        .collect();

    format!("<ul>\n{}</ul>", items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> AiReport {
        AiReport {
            risk_scores: None,
            report_html: "<h2>Key risks</h2><p>Stay alert.</p>".to_string(),
        }
    }

    fn scores() -> RiskScores {
        RiskScores {
            flood: 1,
            fire: 8,
            wind: 3,
            air: 5,
            heat: 6,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_renders_risk_blocks_with_severity() {
        let report = report();
        let scores = scores();
        let html = render_html(&ReportContext {
            address: "1 Infinite Loop, Cupertino, CA",
            recipient: "a@example.com",
            generated_on: date(),
            report: &report,
            risk_scores: Some(&scores),
            chart_url: None,
            facilities: &[],
        });

        assert!(html.contains(
            "<div class=\"risk-block high\"><span class=\"risk-icon\">\u{1F525}</span><span class=\"risk-name\">Fire</span><span class=\"risk-score\">8/10</span><span class=\"risk-label\">Major</span></div>"
        ));
        assert!(html.contains("<span class=\"risk-name\">Flood</span><span class=\"risk-score\">1/10</span><span class=\"risk-label\">Minor</span>"));
        assert!(html.contains("<span class=\"risk-name\">Air</span><span class=\"risk-score\">5/10</span><span class=\"risk-label\">Moderate</span>"));
        assert!(html.contains("October 19, 2026"));
    }

    #[test]
    fn test_untrusted_values_are_escaped() {
        let report = report();
        let facilities = vec![HospitalEntry {
            name: "<b>Clinic</b>".to_string(),
            formatted_address: "5 \"Quoted\" Ave".to_string(),
        }];
        let html = render_html(&ReportContext {
            address: "<script>alert(1)</script>",
            recipient: "<img src=x onerror=alert(2)>@example.com",
            generated_on: date(),
            report: &report,
            risk_scores: None,
            chart_url: Some("https://charts.example/c?x=\"><script>"),
            facilities: &facilities,
        });

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img src=x"));
        assert!(!html.contains("<b>Clinic</b>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("5 &quot;Quoted&quot; Ave"));
    }

    #[test]
    fn test_narrative_is_inserted_verbatim() {
        let report = report();
        let html = render_html(&ReportContext {
            address: "1 Main St",
            recipient: "a@example.com",
            generated_on: date(),
            report: &report,
            risk_scores: None,
            chart_url: None,
            facilities: &[],
        });

        assert!(html.contains("<h2>Key risks</h2><p>Stay alert.</p>"));
        assert!(!html.contains("risk-grid\">"));
        assert!(!html.contains("class=\"chart\""));
    }

    #[test]
    fn test_empty_facilities_show_placeholder() {
        let report = report();
        let html = render_html(&ReportContext {
            address: "1 Main St",
            recipient: "a@example.com",
            generated_on: date(),
            report: &report,
            risk_scores: None,
            chart_url: None,
            facilities: &[],
        });

        assert!(html.contains(NO_FACILITIES_PLACEHOLDER));
    }

    #[test]
    fn test_facilities_and_chart_are_listed() {
        let report = report();
        let facilities = vec![HospitalEntry {
            name: "Valley Medical".to_string(),
            formatted_address: "10 Valley Rd".to_string(),
        }];
        let html = render_html(&ReportContext {
            address: "1 Main St",
            recipient: "a@example.com",
            generated_on: date(),
            report: &report,
            risk_scores: None,
            chart_url: Some("https://quickchart.io/chart?c=%7B%7D&w=1"),
            facilities: &facilities,
        });

        assert!(html.contains("<li><strong>Valley Medical</strong><br>10 Valley Rd</li>"));
        assert!(!html.contains(NO_FACILITIES_PLACEHOLDER));
        assert!(html.contains("src=\"https://quickchart.io/chart?c=%7B%7D&amp;w=1\""));
    }
}
