//! Prompts for evacuation plan recommendations

use crate::model::{ReportFormat, RiskScores};

/// System prompt shared by both output formats
pub const RECOMMENDATION_SYSTEM_PROMPT: &str = r#"You are an emergency preparedness advisor.

Your role is to write a personalised evacuation plan for a single household
at a given street address.

You must:
- Estimate the local exposure to flood, wildfire, wind storms, poor air quality and extreme heat
- Give concrete evacuation steps, a go-bag checklist and a family communication plan
- Refer to the region around the address, not to generic locations
- Write for a non-expert reader

Do not:
- Invent street names, shelter names or phone numbers
- Include scripts, styles, images or links in the HTML you produce"#;

/// Build the user prompt for an address
pub fn build_recommendation_prompt(
    address: &str,
    known_scores: Option<&RiskScores>,
    format: ReportFormat,
) -> String {
    let mut prompt = format!("Address: {}\n\n", address);

    if let Some(scores) = known_scores {
        prompt.push_str("The following risk scores (1 = negligible, 10 = extreme) are already known and must be used as-is:\n");
        for (hazard, score) in scores.entries() {
            prompt.push_str(&format!("- {}: {}\n", hazard.key(), score));
        }
        prompt.push('\n');
    }

    match format {
        ReportFormat::Structured => prompt.push_str(STRUCTURED_INSTRUCTIONS),
        ReportFormat::Html => prompt.push_str(HTML_INSTRUCTIONS),
    }

    prompt
}

const STRUCTURED_INSTRUCTIONS: &str = r#"Respond with a single JSON object and nothing else. It must have exactly these keys:

{
  "riskScores": { "flood": <int 1-10>, "fire": <int 1-10>, "wind": <int 1-10>, "air": <int 1-10>, "heat": <int 1-10> },
  "reportHtml": "<HTML fragment using only h2, h3, p, ul, ol, li, strong and em>"
}

The reportHtml must contain sections for: key risks, evacuation routes and timing,
go-bag checklist, and family communication plan."#;

const HTML_INSTRUCTIONS: &str = r#"Respond with an HTML fragment only, using h2, h3, p, ul, ol, li, strong and em.
Do not wrap it in html or body tags and do not add commentary before or after it.
Include sections for: key risks, evacuation routes and timing, go-bag checklist,
and family communication plan."#;
