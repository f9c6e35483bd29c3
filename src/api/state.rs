//! Application state - services shared by every handler.

use std::sync::Arc;

use crate::infra::HealthCheck;
use crate::services::{AccountService, AuthService, CredentialDelivery, ServiceContainer};

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub account_service: Arc<dyn AccountService>,
    pub credential_service: Arc<dyn CredentialDelivery>,
    /// Backing-service probes for `/health`
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    /// Take every service from the container.
    pub fn from_container(services: &dyn ServiceContainer, health: Arc<dyn HealthCheck>) -> Self {
        Self {
            auth_service: services.auth(),
            account_service: services.accounts(),
            credential_service: services.credentials(),
            health,
        }
    }
}
