//! Places text-search client
//!
//! Looks up medical facilities near an address. Enrichment is best-effort:
//! callers go through [`fetch_nearby_facilities`], which never fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::HospitalEntry;

/// Maximum number of facilities included in a report
pub const MAX_FACILITIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("HTTP request failed: {0}")]
    HttpError(reqwest::Error),

    #[error("Places API returned status {status}: {message}")]
    ApiStatus { status: String, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key
        Self::HttpError(e.without_url())
    }
}

/// Source of facilities near an address
#[async_trait]
pub trait FacilityLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<HospitalEntry>, EnrichmentError>;
}

/// Look up hospitals near an address, degrading to an empty list on any failure
pub async fn fetch_nearby_facilities(
    lookup: Option<&dyn FacilityLookup>,
    address: &str,
) -> Vec<HospitalEntry> {
    let Some(lookup) = lookup else {
        return Vec::new();
    };

    let query = format!("hospital near {}", address);

    match lookup.search(&query).await {
        Ok(mut entries) => {
            entries.truncate(MAX_FACILITIES);
            tracing::debug!(
                address = %address,
                count = entries.len(),
                "Fetched nearby facilities"
            );
            entries
        }
        Err(e) => {
            tracing::warn!(
                address = %address,
                error = %e,
                "Nearby facility lookup failed, continuing without facilities"
            );
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: Option<String>,
    formatted_address: Option<String>,
}

/// Client for the places text-search API
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn extract_entries(
        response: TextSearchResponse,
    ) -> Result<Vec<HospitalEntry>, EnrichmentError> {
        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            _ => {
                return Err(EnrichmentError::ApiStatus {
                    status: response.status,
                    message: response.error_message.unwrap_or_default(),
                });
            }
        }

        Ok(response
            .results
            .into_iter()
            .filter_map(|place| match (place.name, place.formatted_address) {
                (Some(name), Some(formatted_address)) if !name.trim().is_empty() => {
                    Some(HospitalEntry {
                        name,
                        formatted_address,
                    })
                }
                _ => None,
            })
            .take(MAX_FACILITIES)
            .collect())
    }
}

#[async_trait]
impl FacilityLookup for PlacesClient {
    async fn search(&self, query: &str) -> Result<Vec<HospitalEntry>, EnrichmentError> {
        let url = format!("{}/textsearch/json", self.base_url);

        tracing::debug!(query = %query, url = %url, "Searching places");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::ParseError(format!(
                "Unexpected status {}: {}",
                status, body
            )));
        }

        let search: TextSearchResponse = response.json().await.map_err(|e| {
            EnrichmentError::ParseError(format!("Failed to deserialize places response: {}", e))
        })?;

        Self::extract_entries(search)
    }
}
