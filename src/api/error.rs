//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::PlanError;

/// Message shown to callers for every non-validation failure
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We could not generate your evacuation plan right now. Please try again later.";

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
/// Only `BadRequest` exposes its detail; the rest are logged and answered generically.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Recommendation could not be produced (500)
    #[error("Recommendation failed: {0}")]
    Recommendation(String),

    /// PDF rendering failed (500)
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Email could not be delivered (500)
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Pipeline exceeded its deadline (500)
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Recommendation(_) => "recommendation_failed",
            ApiError::Render(_) => "render_failed",
            ApiError::Delivery(_) => "delivery_failed",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(_) | ApiError::NotFound(_) => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Recommendation(_)
            | ApiError::Render(_)
            | ApiError::Delivery(_)
            | ApiError::Timeout(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "API error"
            );
        } else {
            tracing::warn!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "API request rejected"
            );
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.public_message(),
            request_id,
        })
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Validation(e) => ApiError::BadRequest(e.to_string()),
            PlanError::Recommendation(e) => ApiError::Recommendation(e.to_string()),
            PlanError::Render(e) => ApiError::Render(e.to_string()),
            PlanError::Delivery(e) => ApiError::Delivery(e.to_string()),
            PlanError::Timeout(_) => ApiError::Timeout(err.to_string()),
            PlanError::Unavailable => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::plan::ValidationError;
    use crate::service::recommendation::RecommendationError;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from(PlanError::Validation(ValidationError::MissingEmail));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Invalid request: email is required");
    }

    #[test]
    fn test_pipeline_failures_hide_detail() {
        let err = ApiError::from(PlanError::Recommendation(RecommendationError::Upstream(
            "401 invalid api key sk-123".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_type(), "recommendation_failed");
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.to_string().contains("sk-123"));
    }
}
