//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_OTP_TTL_SECONDS,
    DEFAULT_REDIS_URL, DEFAULT_SMTP_FROM, DEFAULT_SMTP_PORT, MAX_OTP_TTL_SECONDS,
    MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// SMTP settings. Without `SMTP_HOST` mail is logged instead of sent.
#[derive(Clone)]
pub struct MailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    smtp_pass: Option<String>,
    pub from: String,
    pub smtp_tls: bool,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass", &"[REDACTED]")
            .field("from", &self.from)
            .field("smtp_tls", &self.smtp_tls)
            .finish()
    }
}

impl MailSettings {
    fn from_env() -> Self {
        Self {
            smtp_host: env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),
            from: env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_SMTP_FROM.to_string()),
            smtp_tls: env::var("SMTP_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Whether a real SMTP relay is configured.
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some()
    }

    /// Username/password pair, when both are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.smtp_user, &self.smtp_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    /// Lifetime of a password-change code in seconds
    pub otp_ttl_seconds: u64,
    pub mail: MailSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("otp_ttl_seconds", &self.otp_ttl_seconds)
            .field("mail", &self.mail)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if JWT_SECRET is missing in a release build or is too short.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            Err(_) => {
                return Err(AppError::internal(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRATION_HOURS),
            otp_ttl_seconds: env::var("OTP_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OTP_TTL_SECONDS),
            mail: MailSettings::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration around an explicit JWT secret, everything else
    /// at its default. Used by tests and embedding callers.
    pub fn with_secret(jwt_secret: impl Into<String>) -> AppResult<Self> {
        let config = Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            mail: MailSettings {
                smtp_host: None,
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_user: None,
                smtp_pass: None,
                from: DEFAULT_SMTP_FROM.to_string(),
                smtp_tls: true,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if !(1..=MAX_OTP_TTL_SECONDS).contains(&self.otp_ttl_seconds) {
            return Err(AppError::internal(format!(
                "OTP_TTL_SECONDS must be between 1 and {}",
                MAX_OTP_TTL_SECONDS
            )));
        }
        Ok(())
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::with_secret("too-short");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_otp_ttl_bounds() {
        let mut config = Config::with_secret("a-test-secret-that-is-long-enough-1234").unwrap();

        config.otp_ttl_seconds = 0;
        assert!(config.validate().is_err());

        config.otp_ttl_seconds = MAX_OTP_TTL_SECONDS + 1;
        assert!(config.validate().is_err());

        config.otp_ttl_seconds = MAX_OTP_TTL_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::with_secret("a-test-secret-that-is-long-enough-1234").unwrap();
        let printed = format!("{:?}", config);

        assert!(!printed.contains("a-test-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_mail_defaults_to_log_mode() {
        let config = Config::with_secret("a-test-secret-that-is-long-enough-1234").unwrap();

        assert!(!config.mail.is_configured());
        assert!(config.mail.credentials().is_none());
        assert_eq!(config.otp_ttl_seconds, DEFAULT_OTP_TTL_SECONDS);
    }
}
