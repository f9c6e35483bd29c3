//! Infrastructure layer - External systems integration
//!
//! PostgreSQL through SeaORM, Redis for one-time codes, and the mail
//! transport.

pub mod cache;
pub mod db;
pub mod health;
pub mod mail;
pub mod otp_store;
pub mod repositories;

pub use cache::Cache;
pub use db::{Database, Migrator};
pub use health::{HealthCheck, Infrastructure};
pub use mail::{build_mailer, DeliveryError, LogMailer, MailKind, Mailer, OutgoingMail, SmtpMailer};
pub use otp_store::{OtpStore, RedisOtpStore};
pub use repositories::{UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use mail::MockMailer;
#[cfg(any(test, feature = "test-utils"))]
pub use otp_store::MockOtpStore;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::MockUserRepository;
