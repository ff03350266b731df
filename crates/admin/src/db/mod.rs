//! Database operations for the group-home MySQL database.
//!
//! ## Tables
//!
//! - `users` / `department_histories` - staff and their department periods
//! - `departments`, `roles` - reference data (system roles are seeded)
//! - `group_homes` / `expansions` - facilities and room additions
//! - `residents` / `disability_histories` - residents and support levels
//! - `shift_preferences` - one row per (user, month), entries as JSON
//! - `usage_records` - one row per (resident, date)
//! - `attendance_records` - clock-in / clock-out per shift
//! - `tower_sessions` - session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p grouphome-cli -- migrate
//! ```
//!
//! Queries are built at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database.

pub mod attendance;
pub mod departments;
pub mod expansions;
pub mod group_homes;
pub mod residents;
pub mod roles;
pub mod shift_preferences;
pub mod usage_records;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use thiserror::Error;
use tokio::task::JoinHandle;

pub use attendance::AttendanceRepository;
pub use departments::DepartmentRepository;
pub use expansions::ExpansionRepository;
pub use group_homes::GroupHomeRepository;
pub use residents::ResidentRepository;
pub use roles::RoleRepository;
pub use shift_preferences::ShiftPreferenceRepository;
pub use usage_records::UsageRecordRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a write error, turning constraint violations into [`RepositoryError::Conflict`].
///
/// `unique` is the message shown when a unique key is violated.
pub(crate) fn map_write_error(e: sqlx::Error, unique: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(unique.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(
                "関連するデータが存在しないか、他のデータから参照されています".to_owned(),
            );
        }
    }
    RepositoryError::Database(e)
}

/// Map a JSON column decode failure.
pub(crate) fn corrupt_json(column: &str, e: &serde_json::Error) -> RepositoryError {
    RepositoryError::DataCorruption(format!("invalid JSON in {column}: {e}"))
}

/// Create a `MySQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `MySQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Ping the database with `SELECT 1`.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn ping(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Keep idle connections alive by pinging the pool at a fixed interval.
///
/// Runs until the returned task is aborted. Failures are logged and the loop
/// continues on the next tick.
pub fn spawn_keepalive(pool: MySqlPool, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match ping(&pool).await {
                Ok(()) => tracing::debug!("database keep-alive ok"),
                Err(e) => tracing::warn!(error = %e, "database keep-alive failed"),
            }
        }
    })
}
