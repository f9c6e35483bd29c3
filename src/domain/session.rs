//! Authenticated caller context.

use uuid::Uuid;

/// Identity of the caller behind a request, resolved from its bearer token.
///
/// Handlers pass this explicitly to the services that act "as the caller".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}
