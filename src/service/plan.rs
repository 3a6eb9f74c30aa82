//! Plan request orchestration
//!
//! Validates a request, fetches the recommendation and nearby facilities
//! concurrently, renders the document and mails it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use lettre::Address;
use tokio::sync::Semaphore;

use crate::model::{AiReport, HospitalEntry, PlanRequest, RiskScores};
use crate::service::chart::build_risk_chart_url;
use crate::service::mail::{DeliveryError, ReportMailer};
use crate::service::pdf::{PdfRenderer, RenderError};
use crate::service::places::{FacilityLookup, fetch_nearby_facilities};
use crate::service::recommendation::{RecommendationError, RecommendationService};
use crate::service::report::{ReportContext, render_html};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("address is required")]
    MissingAddress,

    #[error("email is required")]
    MissingEmail,

    #[error("email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidRiskScores(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Recommendation(#[from] RecommendationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Plan generation exceeded {0:?}")]
    Timeout(Duration),

    /// The permit pool was closed
    #[error("Plan service is shutting down")]
    Unavailable,
}

/// A request that passed validation, with trimmed fields
#[derive(Debug, Clone)]
pub struct ValidPlanRequest {
    pub address: String,
    pub email: String,
    pub risk_scores: Option<RiskScores>,
}

/// Check a raw request before any outbound call is made
pub fn validate_request(request: PlanRequest) -> Result<ValidPlanRequest, ValidationError> {
    let address = request.address.trim();
    if address.is_empty() {
        return Err(ValidationError::MissingAddress);
    }

    let email = request.email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    email
        .parse::<Address>()
        .map_err(|_| ValidationError::InvalidEmail(email.to_string()))?;

    if let Some(scores) = &request.risk_scores {
        scores
            .validate()
            .map_err(ValidationError::InvalidRiskScores)?;
    }

    Ok(ValidPlanRequest {
        address: address.to_string(),
        email: email.to_string(),
        risk_scores: request.risk_scores,
    })
}

/// Orchestration limits and enrichment settings
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub chart_base_url: String,
    pub request_timeout: Duration,
    pub max_concurrent_plans: usize,
}

/// Runs the four-stage plan pipeline
pub struct PlanService {
    recommendations: RecommendationService,
    facilities: Option<Arc<dyn FacilityLookup>>,
    renderer: Arc<dyn PdfRenderer>,
    mailer: Arc<dyn ReportMailer>,
    settings: PlanSettings,
    permits: Semaphore,
}

impl PlanService {
    pub fn new(
        recommendations: RecommendationService,
        facilities: Option<Arc<dyn FacilityLookup>>,
        renderer: Arc<dyn PdfRenderer>,
        mailer: Arc<dyn ReportMailer>,
        settings: PlanSettings,
    ) -> Self {
        let permits = Semaphore::new(settings.max_concurrent_plans.max(1));

        tracing::info!(
            facilities_enabled = facilities.is_some(),
            max_concurrent_plans = settings.max_concurrent_plans,
            request_timeout_secs = settings.request_timeout.as_secs(),
            "Plan service initialized"
        );

        Self {
            recommendations,
            facilities,
            renderer,
            mailer,
            settings,
            permits,
        }
    }

    /// Generate a plan and email it; returns the recipient address
    ///
    /// The request deadline covers waiting for a concurrency permit as well as
    /// the pipeline itself.
    pub async fn generate_and_send(&self, request: PlanRequest) -> Result<String, PlanError> {
        let request = validate_request(request)?;

        let start_time = Instant::now();
        let email = request.email.clone();

        let pipeline = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| PlanError::Unavailable)?;
            self.run(request).await
        };

        let outcome = tokio::time::timeout(self.settings.request_timeout, pipeline).await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(
                    email = %email,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    "Evacuation plan delivered"
                );
                Ok(email)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::error!(
                    email = %email,
                    timeout_secs = self.settings.request_timeout.as_secs(),
                    "Evacuation plan request timed out"
                );
                Err(PlanError::Timeout(self.settings.request_timeout))
            }
        }
    }

    async fn run(&self, request: ValidPlanRequest) -> Result<(), PlanError> {
        // Recommendation and enrichment are independent and run together
        let (report, facilities) = futures::future::join(
            self.recommendations
                .fetch_recommendation(&request.address, request.risk_scores.as_ref()),
            fetch_nearby_facilities(self.facilities.as_deref(), &request.address),
        )
        .await;
        let report = report?;

        let html = self.assemble_html(
            &request.address,
            &request.email,
            &report,
            request.risk_scores.as_ref(),
            &facilities,
            Utc::now().date_naive(),
        );

        let pdf = self.renderer.render(&html).await?;

        let pdf_size = pdf.len();
        if let Err(e) = self
            .mailer
            .send_report(&request.email, &request.address, pdf)
            .await
        {
            tracing::error!(
                email = %request.email,
                pdf_size = pdf_size,
                error = %e,
                "Evacuation plan could not be delivered"
            );
            return Err(e.into());
        }

        Ok(())
    }

    /// Render the PDF for fixed sample data, without calling the model or mailer
    pub async fn render_preview(&self) -> Result<Vec<u8>, PlanError> {
        let scores = RiskScores {
            flood: 3,
            fire: 8,
            wind: 5,
            air: 4,
            heat: 7,
        };
        let report = AiReport {
            risk_scores: Some(scores),
            report_html: crate::service::recommendation::DEFAULT_ADVISORY_HTML.to_string(),
        };
        let facilities = vec![
            HospitalEntry {
                name: "Sample General Hospital".to_string(),
                formatted_address: "100 Main St, Springfield".to_string(),
            },
            HospitalEntry {
                name: "Sample Urgent Care".to_string(),
                formatted_address: "22 Oak Ave, Springfield".to_string(),
            },
        ];

        let html = self.assemble_html(
            "123 Sample Street, Springfield",
            "preview@example.com",
            &report,
            Some(&scores),
            &facilities,
            Utc::now().date_naive(),
        );

        Ok(self.renderer.render(&html).await?)
    }

    fn assemble_html(
        &self,
        address: &str,
        recipient: &str,
        report: &AiReport,
        caller_scores: Option<&RiskScores>,
        facilities: &[HospitalEntry],
        generated_on: NaiveDate,
    ) -> String {
        let scores = caller_scores.or(report.risk_scores.as_ref());
        let chart_url = scores.map(|s| build_risk_chart_url(&self.settings.chart_base_url, s));

        render_html(&ReportContext {
            address,
            recipient,
            generated_on,
            report,
            risk_scores: scores,
            chart_url: chart_url.as_deref(),
            facilities,
        })
    }
}
