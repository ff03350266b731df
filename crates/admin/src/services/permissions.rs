//! Role → permission resolution.
//!
//! System roles resolve from the static table in `grouphome_core`; custom
//! roles are loaded from the `roles` table and cached for five minutes.
//! Role edits invalidate the cached entry so the next request sees them.

use std::time::Duration;

use moka::future::Cache;
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use grouphome_core::{PermissionSet, SystemRole};

use crate::db::{RepositoryError, RoleRepository};

/// Resolves a role name to its permissions.
#[derive(Clone)]
pub struct PermissionResolver {
    cache: Cache<String, PermissionSet>,
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionResolver {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Permissions granted to `role_name`.
    ///
    /// Unknown roles resolve to an empty set, so every gated operation is
    /// denied for them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a custom role cannot be loaded.
    #[instrument(skip(self, pool))]
    pub async fn resolve(
        &self,
        pool: &MySqlPool,
        role_name: &str,
    ) -> Result<PermissionSet, RepositoryError> {
        if let Some(role) = SystemRole::from_name(role_name) {
            return Ok(role.permissions());
        }
        if let Some(cached) = self.cache.get(role_name).await {
            debug!("permission cache hit");
            return Ok(cached);
        }

        let permissions = RoleRepository::new(pool)
            .get_by_name(role_name)
            .await?
            .map(|role| role.permissions)
            .unwrap_or_default();
        self.cache
            .insert(role_name.to_owned(), permissions.clone())
            .await;
        Ok(permissions)
    }

    /// Drop the cached permissions for `role_name`.
    pub async fn invalidate(&self, role_name: &str) {
        self.cache.invalidate(role_name).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use grouphome_core::Permission;
    use sqlx::mysql::MySqlPoolOptions;

    use super::*;

    fn lazy_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[tokio::test]
    async fn test_system_roles_skip_the_database() {
        let resolver = PermissionResolver::new();
        let pool = lazy_pool();

        let perms = resolver.resolve(&pool, "staff").await.unwrap();
        assert!(perms.has(Permission::AttendanceRecord));
        assert!(!perms.has(Permission::UsersEdit));
    }

    #[tokio::test]
    async fn test_cached_custom_role_is_served_and_invalidated() {
        let resolver = PermissionResolver::new();
        let pool = lazy_pool();
        let custom: PermissionSet = [Permission::ResidentsView].into_iter().collect();
        resolver
            .cache
            .insert("night_shift".to_owned(), custom.clone())
            .await;

        assert_eq!(resolver.resolve(&pool, "night_shift").await.unwrap(), custom);

        resolver.invalidate("night_shift").await;
        assert!(resolver.cache.get("night_shift").await.is_none());
    }
}
