//! Short-lived storage for password-change codes.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::cache::Cache;
use crate::config::CACHE_PREFIX_PASSWORD_OTP;
use crate::domain::OneTimeCode;
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Store holding at most one live code per user.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Save a code, replacing any earlier one for the same user.
    /// The entry disappears on its own at `expires_at`.
    async fn put(&self, code: &OneTimeCode) -> AppResult<()>;
}

/// Redis-backed code store.
pub struct RedisOtpStore {
    cache: Arc<Cache>,
}

impl RedisOtpStore {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    fn key(user_id: Uuid) -> String {
        format!("{}{}", CACHE_PREFIX_PASSWORD_OTP, user_id)
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, code: &OneTimeCode) -> AppResult<()> {
        let ttl = code.remaining_seconds(Utc::now());
        self.cache
            .set_with_ttl(&Self::key(code.user_id), code, ttl)
            .await
    }
}
