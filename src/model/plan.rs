//! Request, report and enrichment types for evacuation plans

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Lowest valid risk score
pub const MIN_SCORE: u8 = 1;
/// Highest valid risk score
pub const MAX_SCORE: u8 = 10;

/// Incoming plan request
///
/// `address` and `email` default to empty so that a missing field is
/// reported by request validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Street address the plan is generated for
    #[serde(default)]
    pub address: String,
    /// Recipient of the generated PDF
    #[serde(default)]
    pub email: String,
    /// Known risk scores; when present they override model-produced scores
    #[serde(default)]
    pub risk_scores: Option<RiskScores>,
}

/// Five hazard severity ratings on a 1–10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskScores {
    #[serde(deserialize_with = "integer_like")]
    pub flood: u8,
    #[serde(deserialize_with = "integer_like")]
    pub fire: u8,
    #[serde(deserialize_with = "integer_like")]
    pub wind: u8,
    #[serde(deserialize_with = "integer_like")]
    pub air: u8,
    #[serde(deserialize_with = "integer_like")]
    pub heat: u8,
}

impl RiskScores {
    /// Scores paired with their hazard, in report order
    pub fn entries(&self) -> [(Hazard, u8); 5] {
        [
            (Hazard::Flood, self.flood),
            (Hazard::Fire, self.fire),
            (Hazard::Wind, self.wind),
            (Hazard::Air, self.air),
            (Hazard::Heat, self.heat),
        ]
    }

    /// Check that every score lies within 1–10
    pub fn validate(&self) -> Result<(), String> {
        let out_of_range: Vec<String> = self
            .entries()
            .iter()
            .filter(|(_, score)| !(MIN_SCORE..=MAX_SCORE).contains(score))
            .map(|(hazard, score)| format!("{}={}", hazard.key(), score))
            .collect();

        if out_of_range.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "risk scores must be between {} and {}: {}",
                MIN_SCORE,
                MAX_SCORE,
                out_of_range.join(", ")
            ))
        }
    }
}

/// Accept integers, integral floats and numeric strings
fn integer_like<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(i) => i,
        Raw::Float(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
        Raw::Float(f) => {
            return Err(serde::de::Error::custom(format!(
                "expected an integer score, got {}",
                f
            )));
        }
        Raw::Text(s) => s.trim().parse::<i64>().map_err(|_| {
            serde::de::Error::custom(format!("expected an integer score, got {:?}", s))
        })?,
    };

    u8::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("score {} is out of range", value)))
}

/// Hazard categories covered by the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Flood,
    Fire,
    Wind,
    Air,
    Heat,
}

impl Hazard {
    /// Display label used in the chart and the report
    pub fn label(&self) -> &'static str {
        match self {
            Hazard::Flood => "Flood",
            Hazard::Fire => "Fire",
            Hazard::Wind => "Wind",
            Hazard::Air => "Air",
            Hazard::Heat => "Heat",
        }
    }

    /// JSON field name
    pub fn key(&self) -> &'static str {
        match self {
            Hazard::Flood => "flood",
            Hazard::Fire => "fire",
            Hazard::Wind => "wind",
            Hazard::Air => "air",
            Hazard::Heat => "heat",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Hazard::Flood => "\u{1F30A}",
            Hazard::Fire => "\u{1F525}",
            Hazard::Wind => "\u{1F32A}\u{FE0F}",
            Hazard::Air => "\u{1F4A8}",
            Hazard::Heat => "\u{1F321}\u{FE0F}",
        }
    }
}

/// Severity bucket derived from a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    /// 7 and above is major, 4 and above is moderate, anything lower is minor
    pub fn from_score(score: u8) -> Self {
        if score >= 7 {
            Severity::Major
        } else if score >= 4 {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Major => "Major",
        }
    }

    /// CSS class applied to the risk block
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Minor => "low",
            Severity::Moderate => "medium",
            Severity::Major => "high",
        }
    }

    /// Bar and badge colour
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Minor => "#2ecc71",
            Severity::Moderate => "#f39c12",
            Severity::Major => "#e74c3c",
        }
    }
}

/// Narrative produced by the language model
#[derive(Debug, Clone, PartialEq)]
pub struct AiReport {
    /// Present in structured mode, absent for free-form HTML output
    pub risk_scores: Option<RiskScores>,
    /// HTML fragment, inserted into the document as trusted markup
    pub report_html: String,
}

/// Medical facility near the requested address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HospitalEntry {
    pub name: String,
    pub formatted_address: String,
}

/// Success body returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResultMessage {
    pub message: String,
}
