//! Outbound mail transport.
//!
//! Services depend on the [`Mailer`] trait; production wiring uses
//! [`SmtpMailer`] (lettre over SMTP) or [`DisabledMailer`] when SMTP is not
//! configured. Every failure surfaces as a [`MailError`] result - nothing
//! panics across this boundary, so callers can treat a failed send as
//! "retry later".

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// No SMTP transport configured (SMTP_* environment variables missing).
    #[error("mail transport not configured")]
    NotConfigured,

    /// The message has no recipient address.
    #[error("no recipient address")]
    MissingRecipient,

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),
}

/// An outbound email with both plain-text and HTML bodies.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound mail transport seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message. `Ok(())` means the transport accepted the message;
    /// any `Err` means the message was not sent and may be retried.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// SMTP transport backed by lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay address cannot be resolved.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_user.clone(),
            config.smtp_pass.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.to.trim().is_empty() {
            return Err(MailError::MissingRecipient);
        }

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|_| MailError::InvalidAddress(message.to.clone()))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured. Every send fails softly so
/// notification obligations stay pending instead of being dropped.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            "Skipped sending email (transport not configured)"
        );
        Err(MailError::NotConfigured)
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_disabled_mailer_fails_softly() {
        let mailer = DisabledMailer;
        let result = mailer
            .send(&MailMessage {
                to: "user@example.com".into(),
                subject: "hello".into(),
                text: String::new(),
                html: String::new(),
            })
            .await;
        assert!(matches!(result, Err(MailError::NotConfigured)));
    }
}
