//! Mail transport.
//!
//! With `SMTP_HOST` configured messages go out over async SMTP (lettre).
//! Without it, in development, messages are logged instead of sent.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailSettings;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Which of the fixed messages a delivery was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    LoginCredentials,
    PasswordChangeOtp,
}

impl MailKind {
    /// Message shown to the client when this delivery fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            MailKind::LoginCredentials => "Failed to send email. Please try again later.",
            MailKind::PasswordChangeOtp => "Failed to send OTP email. Please try again later.",
        }
    }
}

impl std::fmt::Display for MailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailKind::LoginCredentials => write!(f, "login credentials"),
            MailKind::PasswordChangeOtp => write!(f, "password change OTP"),
        }
    }
}

/// Delivery failure, carrying the transport's own message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid mail address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("could not build message: {0}")]
    Message(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// A composed plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Mail transport abstraction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand one message to the transport.
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError>;
}

/// SMTP transport backed by lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. `smtp_tls` selects STARTTLS, otherwise plain SMTP.
    pub fn new(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let host = settings
            .smtp_host
            .as_deref()
            .ok_or_else(|| DeliveryError::Transport("SMTP_HOST is not set".to_string()))?;

        let builder = if settings.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| DeliveryError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(settings.smtp_port);
        if let Some((user, pass)) = settings.credentials() {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&settings.from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to)?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        tracing::info!(to = %mail.to, "Email sent");
        Ok(())
    }
}

/// Development transport: writes the message to the log and reports success.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        tracing::info!(
            "=== EMAIL (not sent) ===\n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Body:\n{}\n\
             ========================",
            self.from,
            mail.to,
            mail.subject,
            mail.body
        );
        Ok(())
    }
}

/// Pick the transport for the given settings.
///
/// Without `SMTP_HOST`, debug builds log messages instead of sending them;
/// release builds refuse to start.
pub fn build_mailer(settings: &MailSettings) -> Result<Arc<dyn Mailer>, DeliveryError> {
    if settings.is_configured() {
        Ok(Arc::new(SmtpMailer::new(settings)?))
    } else if cfg!(debug_assertions) {
        tracing::warn!("SMTP not configured - logging emails instead of sending");
        Ok(Arc::new(LogMailer::new(settings.from.clone())))
    } else {
        Err(DeliveryError::Transport(
            "SMTP_HOST must be set in release builds".to_string(),
        ))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse::<Mailbox>().map_err(|e| DeliveryError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_parse_mailbox() {
        assert!(parse_mailbox("a@b.com").is_ok());
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(DeliveryError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer::new("noreply@example.com");
        let result = mailer
            .send(OutgoingMail::new("a@b.com", "Subject", "Body"))
            .await;

        assert!(result.is_ok());
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    async fn test_unconfigured_settings_use_log_mailer() {
        let config = Config::with_secret("a-test-secret-that-is-long-enough-1234").unwrap();
        let mailer = build_mailer(&config.mail).unwrap();

        let result = mailer
            .send(OutgoingMail::new("a@b.com", "Subject", "Body"))
            .await;
        assert!(result.is_ok());
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_unconfigured_settings_rejected_in_release() {
        let config = Config::with_secret("a-test-secret-that-is-long-enough-1234").unwrap();

        assert!(matches!(
            build_mailer(&config.mail),
            Err(DeliveryError::Transport(_))
        ));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            MailKind::LoginCredentials.failure_message(),
            "Failed to send email. Please try again later."
        );
        assert_eq!(
            MailKind::PasswordChangeOtp.failure_message(),
            "Failed to send OTP email. Please try again later."
        );
    }
}
