//! Composition of the two fixed account emails.

use std::sync::Arc;

use crate::config::{SUBJECT_LOGIN_CREDENTIALS, SUBJECT_PASSWORD_CHANGE_OTP};
use crate::errors::{AppError, AppResult};
use crate::infra::{MailKind, Mailer, OutgoingMail};

/// Builds plain-text account emails and hands them to the transport.
#[derive(Clone)]
pub struct MailerService {
    mailer: Arc<dyn Mailer>,
}

impl MailerService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send the initial password of a freshly created account.
    pub async fn send_login_credentials(&self, email: &str, password: &str) -> AppResult<()> {
        let body = format!(
            "Your account has been created.\nEmail: {}\nPassword: {}",
            email, password
        );

        self.deliver(
            MailKind::LoginCredentials,
            OutgoingMail::new(email, SUBJECT_LOGIN_CREDENTIALS, body),
        )
        .await
    }

    /// Send a password-change code.
    pub async fn send_otp_email(&self, email: &str, code: &str) -> AppResult<()> {
        let body = format!("Your OTP for password change is: {}", code);

        self.deliver(
            MailKind::PasswordChangeOtp,
            OutgoingMail::new(email, SUBJECT_PASSWORD_CHANGE_OTP, body),
        )
        .await
    }

    async fn deliver(&self, kind: MailKind, mail: OutgoingMail) -> AppResult<()> {
        let to = mail.to.clone();

        self.mailer.send(mail).await.map_err(|e| {
            tracing::error!(to = %to, kind = %kind, error = %e, "Email delivery failed");
            AppError::EmailDelivery(kind, e)
        })
    }
}
