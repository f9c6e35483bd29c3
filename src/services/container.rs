//! Service container - wires the application services together.

use std::sync::Arc;

use super::{
    AccountManager, AccountService, AuthService, Authenticator, CredentialDelivery,
    CredentialWorkflow, MailerService,
};
use crate::config::Config;
use crate::infra::{Mailer, OtpStore, UserRepository};

/// Service container trait for dependency injection.
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn accounts(&self) -> Arc<dyn AccountService>;

    fn credentials(&self) -> Arc<dyn CredentialDelivery>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    account_service: Arc<dyn AccountService>,
    credential_service: Arc<dyn CredentialDelivery>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        account_service: Arc<dyn AccountService>,
        credential_service: Arc<dyn CredentialDelivery>,
    ) -> Self {
        Self {
            auth_service,
            account_service,
            credential_service,
        }
    }

    /// Build every service on top of the given collaborators.
    pub fn wire(
        users: Arc<dyn UserRepository>,
        codes: Arc<dyn OtpStore>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        let credential_service: Arc<dyn CredentialDelivery> = Arc::new(CredentialWorkflow::new(
            users.clone(),
            codes,
            MailerService::new(mailer),
            config.otp_ttl_seconds,
        ));
        let account_service = Arc::new(AccountManager::new(
            users.clone(),
            credential_service.clone(),
        ));
        let auth_service = Arc::new(Authenticator::new(users, config));

        Self {
            auth_service,
            account_service,
            credential_service,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn accounts(&self) -> Arc<dyn AccountService> {
        self.account_service.clone()
    }

    fn credentials(&self) -> Arc<dyn CredentialDelivery> {
        self.credential_service.clone()
    }
}
