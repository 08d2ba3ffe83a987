//! Transactional email dispatch.
//!
//! Uses a Resend-compatible HTTP API for delivery with Askama HTML templates.
//! One delivery attempt per call; the provider's raw answer is returned and
//! the caller decides whether a non-success status matters.

use askama::Template;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use orders_relay_core::Email;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::EmailConfig;

/// HTML template for a rejected return.
#[derive(Template)]
#[template(path = "email/return_rejected.html")]
pub struct ReturnRejectedEmail<'a> {
    pub customer_name: &'a str,
    pub order_number: &'a str,
    pub reason: Option<&'a str>,
}

/// One returned line in the partial refund email.
#[derive(Debug, Clone)]
pub struct RefundLineView {
    pub product_name: String,
    /// Size label, `-` when the item has none.
    pub size: String,
    pub quantity: u32,
    pub total: String,
}

/// HTML template for an accepted partial return.
#[derive(Template)]
#[template(path = "email/partial_refund.html")]
pub struct PartialRefundEmail<'a> {
    pub customer_name: &'a str,
    pub order_number: &'a str,
    pub credit_note_number: &'a str,
    pub items: &'a [RefundLineView],
    pub refund_amount: &'a str,
    pub reason: Option<&'a str>,
    /// Whether the documents made it into the message.
    pub has_attachments: bool,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// HTTP transport error.
    #[error("Email provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider credential is not a valid header value.
    #[error("Invalid email API key: {0}")]
    InvalidKey(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// An email attachment, alive only for a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A message ready for the provider.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Vec<Email>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

/// The provider's raw answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    /// Whether the provider accepted the message.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends HTML email with optional attachments.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Make exactly one delivery attempt.
    async fn send(&self, email: &OutgoingEmail) -> Result<ProviderResponse, MailError>;
}

#[derive(Serialize)]
struct WireAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Serialize)]
struct WireEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<WireAttachment<'a>>,
}

/// Mailer for the Resend `/emails` API.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: Url,
    from_address: Email,
}

impl ResendMailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| MailError::InvalidKey(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base = config.api_url.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/emails"))
            .map_err(|e| MailError::InvalidKey(format!("invalid provider URL: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, email), fields(subject = %email.subject, attachments = email.attachments.len()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<ProviderResponse, MailError> {
        let wire = WireEmail {
            from: self.from_address.as_str(),
            to: email.to.iter().map(Email::as_str).collect(),
            subject: &email.subject,
            html: &email.html,
            attachments: email
                .attachments
                .iter()
                .map(|a| WireAttachment {
                    filename: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let response = self.client.post(self.endpoint.clone()).json(&wire).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ProviderResponse { status, body })
    }
}
