//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{build_mailer, Cache, Database, Infrastructure, RedisOtpStore, UserStore};
use crate::services::Services;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    let db = Arc::new(Database::connect(&config).await?);

    let cache = Arc::new(
        Cache::connect(&config)
            .await
            .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?,
    );

    let mailer = build_mailer(&config.mail)
        .map_err(|e| AppError::internal(format!("Mail transport setup failed: {}", e)))?;

    let services = Services::wire(
        Arc::new(UserStore::new(db.get_connection())),
        Arc::new(RedisOtpStore::new(cache.clone())),
        mailer,
        config,
    );
    let health = Arc::new(Infrastructure::new(db, cache));

    let app = create_router(AppState::from_container(&services, health));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}
