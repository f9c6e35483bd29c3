//! Credential delivery: initial-password email and the password-change flow.
//!
//! Neither flow is atomic. A row that was persisted stays persisted when the
//! email that follows it fails; the failure is reported after the fact.

use async_trait::async_trait;
use std::sync::Arc;

use super::MailerService;
use crate::domain::{AuthContext, ChangePassword, OneTimeCode, Password, User};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{OtpStore, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Credential delivery trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CredentialDelivery: Send + Sync {
    /// Email the plaintext initial password to a newly created user.
    async fn send_login_credentials(&self, user: &User, password: &str) -> AppResult<()>;

    /// Change the caller's password.
    ///
    /// Old password checked, code issued and stored, code emailed, new hash
    /// persisted, in that order. The hash is persisted even when the email
    /// fails, and the code is not checked before it is.
    async fn change_password(&self, caller: &AuthContext, request: ChangePassword)
        -> AppResult<()>;
}

/// Concrete implementation of CredentialDelivery
pub struct CredentialWorkflow {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn OtpStore>,
    mailer: MailerService,
    otp_ttl_seconds: u64,
}

impl CredentialWorkflow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codes: Arc<dyn OtpStore>,
        mailer: MailerService,
        otp_ttl_seconds: u64,
    ) -> Self {
        Self {
            users,
            codes,
            mailer,
            otp_ttl_seconds,
        }
    }
}

#[async_trait]
impl CredentialDelivery for CredentialWorkflow {
    async fn send_login_credentials(&self, user: &User, password: &str) -> AppResult<()> {
        self.mailer
            .send_login_credentials(&user.email, password)
            .await?;

        tracing::info!(user_id = %user.id, "Login credentials sent");
        Ok(())
    }

    async fn change_password(
        &self,
        caller: &AuthContext,
        request: ChangePassword,
    ) -> AppResult<()> {
        let (old_password, new_password) = request.into_pair()?;

        let user = self
            .users
            .find_by_id(caller.user_id)
            .await?
            .ok_or_not_found()?;

        if !Password::from_hash(user.password_hash.clone()).verify(&old_password) {
            tracing::info!(user_id = %user.id, "Password change rejected: old password mismatch");
            return Err(AppError::OldPasswordMismatch);
        }

        let code = OneTimeCode::issue(user.id, self.otp_ttl_seconds);
        self.codes.put(&code).await?;
        tracing::debug!(user_id = %user.id, expires_at = %code.expires_at, "Password change code issued");

        // The failure is surfaced only after the new hash is stored
        let delivery = self.mailer.send_otp_email(&user.email, code.code()).await;

        let password_hash = Password::new(&new_password)?.into_string();
        self.users.update_password(user.id, password_hash).await?;
        tracing::info!(user_id = %user.id, "Password changed");

        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{DeliveryError, MockMailer, MockOtpStore, MockUserRepository};
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with_password(plain: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: None,
            phone_number: None,
            user_name: None,
            password_hash: Password::new(plain).unwrap().into_string(),
            is_deleted: false,
            role_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn request(old: &str, new: &str) -> ChangePassword {
        ChangePassword {
            old_password: Some(old.to_string()),
            new_password: Some(new.to_string()),
        }
    }

    fn workflow(
        users: MockUserRepository,
        codes: MockOtpStore,
        mailer: MockMailer,
    ) -> CredentialWorkflow {
        CredentialWorkflow::new(
            Arc::new(users),
            Arc::new(codes),
            MailerService::new(Arc::new(mailer)),
            600,
        )
    }

    #[tokio::test]
    async fn test_wrong_old_password_changes_nothing() {
        let user = user_with_password("current");
        let caller = AuthContext::new(user.id, user.email.clone());

        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users.expect_update_password().never();

        let mut codes = MockOtpStore::new();
        codes.expect_put().never();

        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let result = workflow(users, codes, mailer)
            .change_password(&caller, request("wrong", "next"))
            .await;

        assert!(matches!(result, Err(AppError::OldPasswordMismatch)));
    }

    #[tokio::test]
    async fn test_change_password_issues_code_then_updates() {
        let user = user_with_password("current");
        let caller = AuthContext::new(user.id, user.email.clone());
        let user_id = user.id;

        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_update_password()
            .withf(move |id, hash| *id == user_id && Password::from_hash(hash.clone()).verify("next"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut codes = MockOtpStore::new();
        codes
            .expect_put()
            .withf(move |code| code.user_id == user_id && code.code().len() == 6)
            .times(1)
            .returning(|_| Ok(()));

        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|mail| {
                mail.to == "a@b.com"
                    && mail.subject == "Password Change OTP"
                    && mail.body.starts_with("Your OTP for password change is: ")
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = workflow(users, codes, mailer)
            .change_password(&caller, request("current", "next"))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_otp_email_still_updates_password() {
        let user = user_with_password("current");
        let caller = AuthContext::new(user.id, user.email.clone());

        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_update_password()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut codes = MockOtpStore::new();
        codes.expect_put().times(1).returning(|_| Ok(()));

        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::Transport("smtp down".to_string())));

        let result = workflow(users, codes, mailer)
            .change_password(&caller, request("current", "next"))
            .await;

        assert!(matches!(result, Err(AppError::EmailDelivery(..))));
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_before_lookup() {
        let caller = AuthContext::new(Uuid::new_v4(), "a@b.com");

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();

        let result = workflow(users, MockOtpStore::new(), MockMailer::new())
            .change_password(&caller, ChangePassword::default())
            .await;

        match result {
            Err(AppError::Validation(fields)) => {
                assert!(fields.has("oldPassword"));
                assert!(fields.has("newPassword"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_credentials_failure_is_reported() {
        let user = user_with_password("p1");

        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(DeliveryError::Transport("smtp down".to_string())));

        let result = workflow(MockUserRepository::new(), MockOtpStore::new(), mailer)
            .send_login_credentials(&user, "p1")
            .await;

        assert!(matches!(result, Err(AppError::EmailDelivery(..))));
    }
}
