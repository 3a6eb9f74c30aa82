//! HTML-to-PDF rendering
//!
//! The orchestrator only sees [`PdfRenderer`]. [`HttpPdfRenderer`] speaks to
//! a rendering service that either answers with the PDF inline or with a job
//! descriptor pointing at a download (possibly after polling).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

/// First bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("HTTP request failed: {0}")]
    HttpError(reqwest::Error),

    #[error("Rendering service returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Rendering job failed: {0}")]
    JobFailed(String),

    #[error("Malformed rendering response: {0}")]
    Malformed(String),

    #[error("Rendering job did not complete after {0} polls")]
    Timeout(u32),
}

impl From<reqwest::Error> for RenderError {
    fn from(e: reqwest::Error) -> Self {
        // Download links are often signed; keep them out of error text
        Self::HttpError(e.without_url())
    }
}

/// Converts an HTML document into PDF bytes
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderPayload<'a> {
    html: &'a str,
    inline_pdf: bool,
    file_name: &'a str,
}

/// Job descriptor returned instead of inline bytes
///
/// Field aliases cover the spellings used by common rendering services.
#[derive(Debug, Default, Deserialize)]
struct JobDescriptor {
    #[serde(alias = "FileUrl", alias = "fileUrl", alias = "url")]
    download_url: Option<String>,
    #[serde(alias = "Success")]
    success: Option<bool>,
    #[serde(alias = "Error")]
    error: Option<String>,
    status: Option<String>,
    #[serde(alias = "jobId", alias = "job_id")]
    id: Option<String>,
    #[serde(alias = "statusUrl")]
    status_url: Option<String>,
}

/// Next step derived from a job descriptor
#[derive(Debug, PartialEq, Eq)]
enum JobState {
    Ready(String),
    Pending(String),
    Failed(String),
}

impl JobDescriptor {
    fn state(self, endpoint: &str) -> Result<JobState, RenderError> {
        let failed_status = self
            .status
            .as_deref()
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "failed" | "error"))
            .unwrap_or(false);

        if self.success == Some(false) || failed_status {
            return Ok(JobState::Failed(
                self.error
                    .unwrap_or_else(|| "rendering service reported failure".to_string()),
            ));
        }

        if let Some(url) = self.download_url.filter(|u| !u.trim().is_empty()) {
            return Ok(JobState::Ready(url));
        }

        if let Some(status_url) = self.status_url {
            return Ok(JobState::Pending(status_url));
        }

        if let Some(id) = self.id {
            return Ok(JobState::Pending(format!(
                "{}/jobs/{}",
                endpoint.trim_end_matches('/'),
                id
            )));
        }

        Err(RenderError::Malformed(
            "descriptor has neither a download URL nor a job id".to_string(),
        ))
    }
}

/// Rendering service client over HTTP
pub struct HttpPdfRenderer {
    client: Client,
    endpoint: String,
    api_key: String,
    api_key_header: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpPdfRenderer {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        api_key_header: &str,
        timeout: Duration,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent("evacuation-plan-service/1.0")
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            api_key_header: api_key_header.to_string(),
            poll_interval,
            max_polls,
        }
    }

    async fn submit(&self, html: &str) -> Result<reqwest::Response, RenderError> {
        let payload = RenderPayload {
            html,
            inline_pdf: true,
            file_name: "evacuation-plan.pdf",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .json(&payload)
            .send()
            .await?;

        check_status(response).await
    }

    /// Poll a job status URL; the key is only sent back to the rendering service itself
    async fn poll(&self, status_url: &str) -> Result<JobDescriptor, RenderError> {
        let mut request = self.client.get(status_url);
        if same_origin(&self.endpoint, status_url) {
            request = request.header(self.api_key_header.as_str(), self.api_key.as_str());
        }

        check_status(request.send().await?)
            .await?
            .json()
            .await
            .map_err(|e| RenderError::Malformed(format!("Failed to parse job status: {}", e)))
    }

    /// Download a finished document; storage links are pre-signed and get no credentials
    async fn download(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let response = check_status(self.client.get(url).send().await?).await?;
        pdf_bytes(response.bytes().await?.to_vec())
    }

    /// Follow a job descriptor until the PDF can be downloaded
    async fn resolve_job(&self, descriptor: JobDescriptor) -> Result<Vec<u8>, RenderError> {
        let mut state = descriptor.state(&self.endpoint)?;
        let mut polls = 0;

        loop {
            match state {
                JobState::Ready(url) => {
                    tracing::debug!(polls = polls, "Downloading rendered PDF");
                    return self.download(&url).await;
                }
                JobState::Failed(reason) => return Err(RenderError::JobFailed(reason)),
                JobState::Pending(status_url) => {
                    if polls >= self.max_polls {
                        return Err(RenderError::Timeout(polls));
                    }
                    polls += 1;
                    tokio::time::sleep(self.poll_interval).await;

                    tracing::debug!(
                        status_url = %status_url,
                        poll = polls,
                        "Polling rendering job"
                    );
                    state = self.poll(&status_url).await?.state(&self.endpoint)?;
                }
            }
        }
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let start_time = std::time::Instant::now();

        tracing::debug!(
            endpoint = %self.endpoint,
            html_length = html.len(),
            "Submitting document for PDF rendering"
        );

        let response = self.submit(html).await?;

        let is_pdf = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/pdf"))
            .unwrap_or(false);

        let pdf = if is_pdf {
            pdf_bytes(response.bytes().await?.to_vec())?
        } else {
            let descriptor: JobDescriptor = response.json().await.map_err(|e| {
                RenderError::Malformed(format!("Failed to parse job descriptor: {}", e))
            })?;
            self.resolve_job(descriptor).await?
        };

        tracing::info!(
            elapsed_ms = start_time.elapsed().as_millis(),
            pdf_size = pdf.len(),
            inline = is_pdf,
            "PDF rendered"
        );

        Ok(pdf)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RenderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RenderError::Upstream { status, body })
}

fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn pdf_bytes(bytes: Vec<u8>) -> Result<Vec<u8>, RenderError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(bytes)
    } else {
        Err(RenderError::Malformed(format!(
            "payload of {} bytes is not a PDF",
            bytes.len()
        )))
    }
}
