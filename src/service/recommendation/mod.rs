//! Evacuation plan recommendation service using LLM
//!
//! Asks the language model for a narrative plan (and, in structured mode,
//! risk scores) for a single address.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::{AiReport, FallbackPolicy, ReportFormat, RiskScores};
use crate::service::llm::{GenerationRequest, TextGenerator};

pub mod error;
pub mod parse;
pub mod prompts;

pub use error::RecommendationError;
use parse::{parse_html_report, parse_structured_report};
use prompts::{RECOMMENDATION_SYSTEM_PROMPT, build_recommendation_prompt};

/// General advice used when the model is unreachable and fallback is enabled
pub const DEFAULT_ADVISORY_HTML: &str = r#"<h2>General evacuation guidance</h2>
<p>We could not prepare a personalised assessment for this address right now. The guidance below applies to most households.</p>
<h3>Before an emergency</h3>
<ul>
<li>Sign up for local emergency alerts and keep a battery-powered radio.</li>
<li>Identify two ways out of your neighbourhood and a meeting point outside it.</li>
<li>Keep your vehicle fuelled to at least half a tank during high-risk seasons.</li>
</ul>
<h3>Go-bag checklist</h3>
<ul>
<li>Water and non-perishable food for three days</li>
<li>Medications, copies of prescriptions and important documents</li>
<li>Phone chargers, flashlight, first-aid kit and cash</li>
</ul>
<h3>Family communication plan</h3>
<p>Choose an out-of-area contact every family member can call or text, and write the number down.</p>"#;

/// Service that produces the narrative part of a plan
pub struct RecommendationService {
    generator: Arc<dyn TextGenerator>,
    format: ReportFormat,
    fallback: FallbackPolicy,
    timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        format: ReportFormat,
        fallback: FallbackPolicy,
        timeout: Duration,
    ) -> Self {
        tracing::info!(
            model = %generator.model(),
            format = ?format,
            fallback = ?fallback,
            "Recommendation service initialized"
        );

        Self {
            generator,
            format,
            fallback,
            timeout,
        }
    }

    /// Fetch a recommendation for an address
    ///
    /// Caller-supplied scores are passed to the model as known values and
    /// take precedence over any scores it returns.
    pub async fn fetch_recommendation(
        &self,
        address: &str,
        known_scores: Option<&RiskScores>,
    ) -> Result<AiReport, RecommendationError> {
        match self.request_report(address, known_scores).await {
            Ok(mut report) => {
                if let Some(scores) = known_scores {
                    report.risk_scores = Some(*scores);
                }
                Ok(report)
            }
            Err(e @ RecommendationError::Parse(_)) => Err(e),
            Err(e) => match self.fallback {
                FallbackPolicy::Fail => Err(e),
                FallbackPolicy::DefaultAdvisory => {
                    tracing::warn!(
                        address = %address,
                        error = %e,
                        "Recommendation unavailable, using default advisory plan"
                    );
                    Ok(AiReport {
                        risk_scores: known_scores.copied(),
                        report_html: DEFAULT_ADVISORY_HTML.to_string(),
                    })
                }
            },
        }
    }

    async fn request_report(
        &self,
        address: &str,
        known_scores: Option<&RiskScores>,
    ) -> Result<AiReport, RecommendationError> {
        let start_time = Instant::now();

        let request = GenerationRequest {
            preamble: RECOMMENDATION_SYSTEM_PROMPT.to_string(),
            prompt: build_recommendation_prompt(address, known_scores, self.format),
            json_output: self.format == ReportFormat::Structured,
        };

        tracing::debug!(
            address = %address,
            model = %self.generator.model(),
            prompt_length = request.prompt.len(),
            json_output = request.json_output,
            "Requesting evacuation plan recommendation"
        );

        let text = match tokio::time::timeout(self.timeout, self.generator.generate(&request)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(
                    address = %address,
                    model = %self.generator.model(),
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %e,
                    "Recommendation request failed"
                );
                return Err(RecommendationError::Upstream(e.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    address = %address,
                    model = %self.generator.model(),
                    timeout_ms = self.timeout.as_millis(),
                    "Recommendation request timed out"
                );
                return Err(RecommendationError::Timeout(self.timeout));
            }
        };

        let parsed = match self.format {
            ReportFormat::Structured => parse_structured_report(&text),
            ReportFormat::Html => parse_html_report(&text),
        };

        match parsed {
            Ok(report) => {
                tracing::info!(
                    address = %address,
                    model = %self.generator.model(),
                    elapsed_ms = start_time.elapsed().as_millis(),
                    response_length = text.len(),
                    "Recommendation received"
                );
                Ok(report)
            }
            Err(reason) => {
                tracing::error!(
                    address = %address,
                    model = %self.generator.model(),
                    response_length = text.len(),
                    reason = %reason,
                    "Recommendation response could not be parsed"
                );
                Err(RecommendationError::Parse(reason))
            }
        }
    }
}
