//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure and depend on
//! collaborator traits, never on concrete stores.

mod account_service;
mod auth_service;
pub mod container;
mod credential_service;
mod mailer_service;

pub use container::{ServiceContainer, Services};

pub use account_service::{AccountManager, AccountService};
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use credential_service::{CredentialDelivery, CredentialWorkflow};
pub use mailer_service::MailerService;

#[cfg(any(test, feature = "test-utils"))]
pub use credential_service::MockCredentialDelivery;
