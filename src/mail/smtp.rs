//! SMTP relay delivery via lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::SmtpConfig;

/// Sends mail through a STARTTLS relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| MailError::Transport("SMTP host is not configured".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: mailbox(Some(&config.from_name), &config.from_address)?,
        })
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .to(mailbox(email.to_name.as_deref(), &email.to_address)?)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox, MailError> {
    let address = address
        .parse()
        .map_err(|_| MailError::Address(address.to_string()))?;
    Ok(Mailbox::new(name.map(str::to_string), address))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email.to_address.clone();
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(to = %to, "Mail handed to SMTP relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            ..SmtpConfig::default()
        }
    }

    #[tokio::test]
    async fn builds_multipart_message() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .build_message(OutgoingEmail {
                to_name: None,
                to_address: "ana@example.com".to_string(),
                subject: "Seu código".to_string(),
                text_body: "123456".to_string(),
                html_body: "<b>123456</b>".to_string(),
            })
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ana@example.com"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn rejects_invalid_recipient() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let result = mailer.build_message(OutgoingEmail {
            to_name: None,
            to_address: "not-an-address".to_string(),
            subject: "x".to_string(),
            text_body: String::new(),
            html_body: String::new(),
        });
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
