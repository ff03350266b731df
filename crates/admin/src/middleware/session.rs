//! Session middleware configuration for admin.
//!
//! Sessions live in `MySQL` via tower-sessions. Cookies are `SameSite=Strict`
//! and expire after eight hours of inactivity.

use sqlx::MySqlPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::MySqlStore;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "grouphome_session";

/// Session expiry time in seconds (one working shift).
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

/// The `MySQL` session store.
///
/// Its table is created by `MySqlStore::migrate`, which the CLI `migrate`
/// command runs alongside the schema migrations.
#[must_use]
pub fn session_store(pool: &MySqlPool) -> MySqlStore {
    MySqlStore::new(pool.clone())
}

/// Create the session layer around `store`.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &AdminConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
