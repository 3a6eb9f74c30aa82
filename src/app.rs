//! Application state and service initialization
//!
//! This module centralizes all service initialization and dependency injection,
//! making it easier to manage the application lifecycle and test services.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::model::Config;
use crate::service::mail::SmtpSettings;
use crate::service::places::FacilityLookup;
use crate::service::{
    HttpPdfRenderer, LlmClient, PlacesClient, PlanService, PlanSettings, RecommendationService,
    SmtpMailer,
};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Plan orchestration service
    pub plan_service: PlanService,
    /// Whether the sample-data preview route answers
    pub preview_enabled: bool,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Endpoint validation for every configured upstream
    /// 2. LLM client initialization (requires OPENAI_API_KEY)
    /// 3. PDF renderer and SMTP mailer initialization (require credentials)
    /// 4. Optional facility lookup (skipped without PLACES_API_KEY)
    pub fn new(config: Config) -> Result<Self, AppError> {
        validate_url("chart.base_url", &config.chart.base_url)?;
        validate_url("pdf.endpoint", &config.pdf.endpoint)?;

        let api_key = config
            .llm
            .api_key
            .as_deref()
            .ok_or(AppError::MissingConfig("OPENAI_API_KEY"))?;

        let llm_client = LlmClient::new(api_key, &config.llm.model);

        let recommendations = RecommendationService::new(
            Arc::new(llm_client),
            config.llm.report_format,
            config.llm.fallback,
            config.upstream_timeout,
        );

        let facilities = Self::build_facility_lookup(&config)?;
        let renderer = Self::build_renderer(&config)?;
        let mailer = Self::build_mailer(&config)?;

        let plan_service = PlanService::new(
            recommendations,
            facilities,
            renderer,
            mailer,
            PlanSettings {
                chart_base_url: config.chart.base_url.clone(),
                request_timeout: config.request_timeout,
                max_concurrent_plans: config.max_concurrent_plans,
            },
        );

        Ok(Self {
            plan_service,
            preview_enabled: config.preview_enabled,
        })
    }

    /// Build the facility lookup when a places key is configured
    fn build_facility_lookup(
        config: &Config,
    ) -> Result<Option<Arc<dyn FacilityLookup>>, AppError> {
        let Some(api_key) = config.places.api_key.as_deref() else {
            tracing::warn!("PLACES_API_KEY not set, plans will not list nearby facilities");
            return Ok(None);
        };

        validate_url("places.base_url", &config.places.base_url)?;

        let client = PlacesClient::new(&config.places.base_url, api_key, config.upstream_timeout);
        Ok(Some(Arc::new(client) as Arc<dyn FacilityLookup>))
    }

    /// Build the PDF renderer client
    fn build_renderer(config: &Config) -> Result<Arc<HttpPdfRenderer>, AppError> {
        let api_key = config
            .pdf
            .api_key
            .as_deref()
            .ok_or(AppError::MissingConfig("PDF_API_KEY"))?;

        Ok(Arc::new(HttpPdfRenderer::new(
            &config.pdf.endpoint,
            api_key,
            &config.pdf.api_key_header,
            config.upstream_timeout,
            Duration::from_millis(config.pdf.poll_interval_ms),
            config.pdf.max_polls,
        )))
    }

    /// Build the SMTP mailer
    fn build_mailer(config: &Config) -> Result<Arc<SmtpMailer>, AppError> {
        let username = config
            .mail
            .username
            .clone()
            .ok_or(AppError::MissingConfig("SMTP_USERNAME"))?;
        let password = config
            .mail
            .password
            .clone()
            .ok_or(AppError::MissingConfig("SMTP_PASSWORD"))?;

        let settings = SmtpSettings {
            host: config.mail.host.clone(),
            port: config.mail.port,
            tls: config.mail.tls,
            username,
            password,
            from: config.mail.from.clone(),
            timeout: config.upstream_timeout,
        };

        SmtpMailer::new(&settings)
            .map(Arc::new)
            .map_err(|e| AppError::InvalidConfig(format!("mail: {}", e)))
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), AppError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::InvalidConfig(format!("{} '{}': {}", name, value, e)))
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-test".to_string());
        config.pdf.api_key = Some("pdf-key".to_string());
        config.mail.username = Some("planner@example.com".to_string());
        config.mail.password = Some("secret".to_string());
        config.mail.from = "planner@example.com".to_string();
        config
    }

    #[tokio::test]
    async fn test_builds_with_required_credentials() {
        let state = AppState::new(complete_config()).unwrap();
        assert!(!state.preview_enabled);
    }

    #[tokio::test]
    async fn test_missing_llm_key() {
        let mut config = complete_config();
        config.llm.api_key = None;

        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, AppError::MissingConfig("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn test_missing_smtp_password() {
        let mut config = complete_config();
        config.mail.password = None;

        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, AppError::MissingConfig("SMTP_PASSWORD")));
    }

    #[tokio::test]
    async fn test_rejects_malformed_endpoint() {
        let mut config = complete_config();
        config.pdf.endpoint = "not a url".to_string();

        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }
}
