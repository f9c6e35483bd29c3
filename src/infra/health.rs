//! Backing-service probes for the health endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use super::{cache::Cache, db::Database};
use crate::config::HEALTH_PROBE_KEY;

/// Reachability of the database and the code store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn database(&self) -> Result<(), String>;
    async fn cache(&self) -> Result<(), String>;
}

/// Live probes against PostgreSQL and Redis.
pub struct Infrastructure {
    database: Arc<Database>,
    cache: Arc<Cache>,
}

impl Infrastructure {
    pub fn new(database: Arc<Database>, cache: Arc<Cache>) -> Self {
        Self { database, cache }
    }
}

#[async_trait]
impl HealthCheck for Infrastructure {
    async fn database(&self) -> Result<(), String> {
        self.database.ping().await.map_err(|e| e.to_string())
    }

    async fn cache(&self) -> Result<(), String> {
        // A missing key is fine; only the round trip matters
        self.cache
            .exists(HEALTH_PROBE_KEY)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
