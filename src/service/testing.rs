//! Test doubles for the pipeline seams and a throwaway upstream HTTP server

use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpServer, web};
use async_trait::async_trait;

use crate::model::HospitalEntry;
use crate::service::llm::{GenerationRequest, LlmError, TextGenerator};
use crate::service::mail::{DeliveryError, ReportMailer};
use crate::service::pdf::{PdfRenderer, RenderError};
use crate::service::places::{EnrichmentError, FacilityLookup};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n%test\n";

pub const STRUCTURED_REPLY: &str = r#"{
    "riskScores": {"flood": 2, "fire": 4, "wind": 3, "air": 2, "heat": 5},
    "reportHtml": "<h2>Key risks</h2><p>Prepare for wildfire smoke.</p>"
}"#;

/// Scripted text generator
pub struct FakeGenerator {
    reply: Result<String, String>,
    delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn structured() -> Self {
        Self::replying(STRUCTURED_REPLY)
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("connection refused".to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(LlmError::Request)
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// Scripted facility lookup
pub struct FakeFacilities {
    reply: Result<Vec<HospitalEntry>, String>,
    delay: Duration,
    queries: Mutex<Vec<String>>,
}

impl FakeFacilities {
    pub fn returning(entries: Vec<HospitalEntry>) -> Self {
        Self {
            reply: Ok(entries),
            delay: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("quota exceeded".to_string()),
            delay: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl FacilityLookup for FakeFacilities {
    async fn search(&self, query: &str) -> Result<Vec<HospitalEntry>, EnrichmentError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(EnrichmentError::ParseError)
    }
}

/// Renderer that records the HTML it receives
pub struct FakeRenderer {
    status: Option<reqwest::StatusCode>,
    documents: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn ok() -> Self {
        Self {
            status: None,
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_with(status: reqwest::StatusCode) -> Self {
        Self {
            status: Some(status),
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        self.documents.lock().unwrap().push(html.to_string());
        match self.status {
            None => Ok(FAKE_PDF.to_vec()),
            Some(status) => Err(RenderError::Upstream {
                status,
                body: "renderer exploded".to_string(),
            }),
        }
    }
}

/// A delivered message as seen by [`FakeMailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReport {
    pub email: String,
    pub address: String,
    pub pdf: Vec<u8>,
}

/// Mailer that records deliveries
pub struct FakeMailer {
    fail: bool,
    sent: Mutex<Vec<SentReport>>,
    attempts: AtomicUsize,
}

impl FakeMailer {
    pub fn ok() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn sent(&self) -> Vec<SentReport> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportMailer for FakeMailer {
    async fn send_report(
        &self,
        email: &str,
        address: &str,
        pdf: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeliveryError::Transport("relay rejected login".to_string()));
        }
        self.sent.lock().unwrap().push(SentReport {
            email: email.to_string(),
            address: address.to_string(),
            pdf,
        });
        Ok(())
    }
}

/// In-process HTTP server standing in for an upstream API
pub struct Upstream {
    addr: SocketAddr,
    handle: ServerHandle,
}

impl Upstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// Start an upstream on an ephemeral port; must run inside an actix runtime
pub async fn spawn_upstream<F>(configure: F) -> Upstream
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind test upstream");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Upstream { addr, handle }
}
