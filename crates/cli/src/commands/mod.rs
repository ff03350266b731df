//! CLI subcommands.

pub mod export;
pub mod migrate;
pub mod seed;
pub mod user;

use grouphome_admin::client::ClientError;
use grouphome_admin::config::{AdminConfig, ConfigError};
use grouphome_admin::db::{self, RepositoryError};
use grouphome_core::validation::ValidationErrors;
use sqlx::MySqlPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Role name not found among system or custom roles.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Staff member already exists with email: {0}")]
    UserExists(String),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("--month is required to export {0}")]
    MonthRequired(&'static str),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load the server configuration and open a small pool.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is
/// unreachable.
pub async fn connect() -> Result<(AdminConfig, MySqlPool), CommandError> {
    let config = AdminConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, 2).await?;
    Ok((config, pool))
}
