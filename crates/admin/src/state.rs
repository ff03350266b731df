//! Application state shared across handlers.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::config::AdminConfig;
use crate::services::PermissionResolver;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: MySqlPool,
    permissions: PermissionResolver,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig, pool: MySqlPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                permissions: PermissionResolver::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionResolver {
        &self.inner.permissions
    }

    /// Today's date in the operator's time zone.
    ///
    /// Status derivation and "current" history entries are evaluated against
    /// this date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.inner.config.today()
    }
}
