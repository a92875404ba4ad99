//! Outbound mail module
//!
//! Provides the [`Mailer`] abstraction the signer OTP function sends through.
//! [`SmtpMailer`] relays over SMTP with lettre; [`LoggingMailer`] only logs and
//! is selected when no relay host is configured; [`RecordingMailer`] keeps
//! messages in memory for tests.

pub mod smtp;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::SmtpConfig;

pub use smtp::SmtpMailer;

/// A rendered message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to_name: Option<String>,
    pub to_address: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Trait for outbound mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Create a mailer from application configuration
pub fn from_config(config: &SmtpConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.host {
        Some(_) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => {
            tracing::warn!("No SMTP host configured; outgoing mail will only be logged");
            Ok(Arc::new(LoggingMailer))
        }
    }
}

/// Mailer that logs instead of sending
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to_address,
            subject = %email.subject,
            "Mail delivery disabled; message not sent"
        );
        Ok(())
    }
}

/// Mailer that records every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            to_name: Some("Maria".to_string()),
            to_address: "maria@example.com".to_string(),
            subject: "Código".to_string(),
            text_body: "123456".to_string(),
            html_body: "<p>123456</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages_in_order() {
        let mailer = RecordingMailer::new();
        mailer.send(sample()).await.unwrap();
        let mut second = sample();
        second.to_address = "joao@example.com".to_string();
        mailer.send(second).await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to_address, "joao@example.com");
    }

    #[tokio::test]
    async fn logging_mailer_without_host() {
        let mailer = from_config(&SmtpConfig::default()).unwrap();
        assert!(mailer.send(sample()).await.is_ok());
    }
}
