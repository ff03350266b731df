//! Database migration command.
//!
//! Applies `crates/admin/migrations/` and creates the session table used by
//! the server's session store. Both steps are idempotent.

use grouphome_admin::middleware::session_store;

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    session_store(&pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
