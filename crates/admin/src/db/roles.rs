//! Role repository.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

use grouphome_core::{PermissionSet, RoleId, SystemRole};

use super::{RepositoryError, corrupt_json, map_write_error};
use crate::models::role::{NewRole, Role};

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    display_name: String,
    permissions: serde_json::Value,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let permissions: PermissionSet = serde_json::from_value(row.permissions)
            .map_err(|e| corrupt_json("roles.permissions", &e))?;
        Ok(Self {
            id: RoleId::new(row.id),
            name: row.name,
            display_name: row.display_name,
            permissions,
            is_system: row.is_system,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ROLE_COLUMNS: &str =
    "SELECT id, name, display_name, permissions, is_system, created_at, updated_at FROM roles";

const NAME_TAKEN: &str = "このロール名は既に登録されています";

/// Repository for role database operations.
pub struct RoleRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> RoleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List roles, system roles first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored permissions are invalid.
    pub async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_COLUMNS} ORDER BY is_system DESC, name"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a role by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored permissions are invalid.
    pub async fn get(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!("{ROLE_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a role by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored permissions are invalid.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!("{ROLE_COLUMNS} WHERE name = ?"))
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a custom role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn create(&self, role: &NewRole) -> Result<Role, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO roles (name, display_name, permissions, is_system) VALUES (?, ?, ?, FALSE)",
        )
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(Json(&role.permissions))
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        let id = i32::try_from(result.last_insert_id())
            .map_err(|e| RepositoryError::DataCorruption(format!("role id out of range: {e}")))?;
        self.get(RoleId::new(id)).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a custom role. System rows are never matched.
    ///
    /// Renaming cascades to `users.role_name`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no custom role has this ID.
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn update(&self, id: RoleId, role: &NewRole) -> Result<Role, RepositoryError> {
        let result = sqlx::query(
            "UPDATE roles SET name = ?, display_name = ?, permissions = ? \
             WHERE id = ? AND is_system = FALSE",
        )
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(Json(&role.permissions))
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        let updated = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        if updated.is_system && result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "システムロールは変更できません".to_owned(),
            ));
        }
        Ok(updated)
    }

    /// Delete a custom role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no custom role has this ID.
    /// Returns `RepositoryError::Conflict` if users still hold the role.
    pub async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ? AND is_system = FALSE")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert or refresh a system role from the static permission table.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_system(&self, role: SystemRole) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO roles (name, display_name, permissions, is_system) VALUES (?, ?, ?, TRUE) \
             ON DUPLICATE KEY UPDATE display_name = VALUES(display_name), \
             permissions = VALUES(permissions), is_system = TRUE",
        )
        .bind(role.as_str())
        .bind(role.display_name())
        .bind(Json(role.permissions()))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
