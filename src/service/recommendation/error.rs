//! Error types for recommendation fetching

use std::time::Duration;

use thiserror::Error;

/// Error type for recommendation fetching
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Text generation failed: {0}")]
    Upstream(String),

    #[error("Malformed recommendation: {0}")]
    Parse(String),

    #[error("Text generation timed out after {0:?}")]
    Timeout(Duration),
}
