//! Account service - user accounts, profiles and credential delivery.
//!
//! # Architecture Layers
//!
//! - **cli** / **commands**: `serve` and `migrate`
//! - **config**: Application configuration and constants
//! - **domain**: Users, passwords, one-time codes, caller context
//! - **services**: Account operations and the credential workflow
//! - **infra**: PostgreSQL, Redis and the mail transport
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response types
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! cargo run -- serve
//! cargo run -- migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

pub use api::AppState;
pub use config::Config;
pub use domain::{AuthContext, Password, User};
pub use errors::{AppError, AppResult};
