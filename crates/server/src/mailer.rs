use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::Serialize;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug)]
pub enum MailError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Http(err) => write!(f, "mail request failed: {err}"),
            MailError::Status { status, body } => write!(f, "Resend API returned {status}: {body}"),
        }
    }
}

impl std::error::Error for MailError {}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Http(err)
    }
}

/// `send(from, to, subject, html)`; the sender address is part of the mailer.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &Email) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Mail sends never fail the operation that triggered them: errors are
/// logged here and dropped.
#[derive(Clone)]
pub struct BestEffort<M>(pub M);

impl<M: Mailer> BestEffort<M> {
    /// Returns whether the mail went out, for logging by the caller only.
    pub async fn send(&self, email: &Email) -> bool {
        match self.0.send(email).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(to = %email.to, subject = %email.subject, "mail not sent: {err}");
                false
            }
        }
    }

    pub fn inner(&self) -> &M {
        &self.0
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Resend HTTP API.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: vec![&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Resend API error: {status} - {body}");
            return Err(MailError::Status { status, body });
        }

        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Keeps every mail in memory instead of delivering it.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "mail captured (no RESEND_API_KEY)");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub enum MailTransport {
    Resend(ResendMailer),
    Memory(MemoryMailer),
}

impl MailTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        match &config.resend_api_key {
            Some(key) => {
                let from = config.from.trim();
                if from.is_empty() {
                    anyhow::bail!("MAIL_FROM must not be empty");
                }
                Ok(MailTransport::Resend(ResendMailer::new(key, from)))
            }
            None => {
                tracing::warn!("RESEND_API_KEY not set, emails are only logged");
                Ok(MailTransport::Memory(MemoryMailer::default()))
            }
        }
    }
}

impl Mailer for MailTransport {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        match self {
            MailTransport::Resend(m) => m.send(email).await,
            MailTransport::Memory(m) => m.send(email).await,
        }
    }
}
