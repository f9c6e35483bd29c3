//! Credential requests and the password-change one-time code.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::{OTP_MAX, OTP_MIN};
use crate::errors::{AppError, AppResult, FieldErrors};

/// Six-digit code issued during a password change.
///
/// Lives only in the short-lived code store; it is never written to the
/// users table.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeCode {
    code: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimeCode")
            .field("code", &"******")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl OneTimeCode {
    /// Draw a fresh code for `user_id`, valid for `ttl_seconds`.
    pub fn issue(user_id: Uuid, ttl_seconds: u64) -> Self {
        let code = rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX);
        let issued_at = Utc::now();
        let ttl = Duration::seconds(
            i64::try_from(ttl_seconds)
                .unwrap_or(i64::MAX)
                .min(i64::MAX / 1000),
        );

        Self {
            code: format!("{:06}", code),
            user_id,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Seconds until expiry, at least 1 so a store TTL is always valid.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let left = (self.expires_at - now).num_seconds();
        u64::try_from(left).unwrap_or(0).max(1)
    }
}

/// Password change request for the authenticated caller
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    #[validate(
        required(message = "The old password field is required."),
        length(min = 1, message = "The old password field is required.")
    )]
    pub old_password: Option<String>,
    #[validate(
        required(message = "The new password field is required."),
        length(min = 1, message = "The new password field is required.")
    )]
    pub new_password: Option<String>,
}

impl std::fmt::Debug for ChangePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePassword").finish_non_exhaustive()
    }
}

impl ChangePassword {
    /// Returns `(old, new)` once both are present.
    pub fn into_pair(self) -> AppResult<(String, String)> {
        FieldErrors::from_validation(self.validate()).into_result()?;

        match (self.old_password, self.new_password) {
            (Some(old), Some(new)) => Ok((old, new)),
            _ => Err(AppError::internal("password change passed validation without both fields")),
        }
    }
}

/// Password reset request addressed by email
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ResetPassword {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    #[schema(example = "a@b.com")]
    pub email: Option<String>,
    #[validate(
        required(message = "The password field is required."),
        length(min = 1, message = "The password field is required.")
    )]
    pub password: Option<String>,
}

impl std::fmt::Debug for ResetPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPassword")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_digits() {
        for _ in 0..200 {
            let otp = OneTimeCode::issue(Uuid::new_v4(), 600);
            let value: u32 = otp.code().parse().unwrap();

            assert_eq!(otp.code().len(), 6);
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn test_expiry_window() {
        let otp = OneTimeCode::issue(Uuid::new_v4(), 600);

        assert_eq!((otp.expires_at - otp.issued_at).num_seconds(), 600);
        assert!(otp.remaining_seconds(otp.issued_at) <= 600);
        assert_eq!(otp.remaining_seconds(otp.expires_at + Duration::seconds(5)), 1);
    }

    #[test]
    fn test_oversized_ttl_saturates() {
        let otp = OneTimeCode::issue(Uuid::new_v4(), u64::MAX);

        assert!(otp.expires_at > otp.issued_at);
        assert!(otp.remaining_seconds(otp.issued_at) > 1);
    }

    #[test]
    fn test_debug_hides_code() {
        let otp = OneTimeCode::issue(Uuid::new_v4(), 60);
        let printed = format!("{:?}", otp);

        assert!(printed.contains("******"));
        assert!(!printed.contains(&format!("\"{}\"", otp.code())));
    }

    #[test]
    fn test_change_password_requires_both_fields() {
        let request = ChangePassword {
            old_password: Some("old".to_string()),
            new_password: None,
        };

        match request.into_pair() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.has("newPassword"));
                assert!(!fields.has("oldPassword"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_change_password_pair() {
        let request = ChangePassword {
            old_password: Some("old".to_string()),
            new_password: Some("new".to_string()),
        };

        assert_eq!(
            request.into_pair().unwrap(),
            ("old".to_string(), "new".to_string())
        );
    }
}
