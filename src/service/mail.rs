//! Report delivery over SMTP

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::model::MailTls;
use crate::service::report::SafeHtml;

/// File name of the PDF attachment
pub const ATTACHMENT_NAME: &str = "evacuation-plan.pdf";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Sends a rendered plan to its recipient
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send_report(
        &self,
        email: &str,
        address: &str,
        pdf: Vec<u8>,
    ) -> Result<(), DeliveryError>;
}

/// Connection parameters for [`SmtpMailer`]
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub tls: MailTls,
    pub username: String,
    pub password: String,
    pub from: String,
    pub timeout: Duration,
}

/// Mailer backed by an authenticated SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::InvalidAddress {
                address: settings.from.clone(),
                reason: e.to_string(),
            })?;

        let builder = match settings.tls {
            MailTls::Plaintext => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
            MailTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
                &settings.host,
            )
            .map_err(|e| DeliveryError::Transport(format!("starttls relay init failed: {}", e)))?,
            MailTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| DeliveryError::Transport(format!("tls relay init failed: {}", e)))?,
        };

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            tls = ?settings.tls,
            "SMTP mailer initialized"
        );

        Ok(Self { transport, from })
    }
}

/// Build the multipart message carrying the plan
pub fn build_message(
    from: Mailbox,
    email: &str,
    address: &str,
    pdf: Vec<u8>,
) -> Result<Message, DeliveryError> {
    let to: Mailbox = email.parse().map_err(|e: lettre::address::AddressError| {
        DeliveryError::InvalidAddress {
            address: email.to_string(),
            reason: e.to_string(),
        }
    })?;

    let body = format!(
        "<p>Hello,</p>\
         <p>Your personal evacuation plan for <strong>{}</strong> is attached to this email.</p>\
         <p>Please review it with everyone in your household and keep a printed copy in your go-bag.</p>",
        SafeHtml::escape(address)
    );

    let pdf_type = ContentType::parse("application/pdf")
        .map_err(|e| DeliveryError::Message(e.to_string()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(format!("Your evacuation plan for {}", address))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(body))
                .singlepart(Attachment::new(ATTACHMENT_NAME.to_string()).body(pdf, pdf_type)),
        )
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

#[async_trait]
impl ReportMailer for SmtpMailer {
    async fn send_report(
        &self,
        email: &str,
        address: &str,
        pdf: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let start_time = std::time::Instant::now();
        let pdf_size = pdf.len();

        let message = build_message(self.from.clone(), email, address, pdf)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(format!("send to '{}' failed: {}", email, e)))?;

        tracing::info!(
            email = %email,
            pdf_size = pdf_size,
            code = %response.code(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Evacuation plan emailed"
        );

        Ok(())
    }
}
