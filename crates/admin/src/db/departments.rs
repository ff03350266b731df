//! Department repository.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use grouphome_core::DepartmentId;

use super::{RepositoryError, map_write_error};
use crate::models::department::Department;

#[derive(Debug, sqlx::FromRow)]
struct DepartmentRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: DepartmentId::new(row.id),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const NAME_TAKEN: &str = "この部署名は既に登録されています";

/// Repository for department database operations.
pub struct DepartmentRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> DepartmentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List all departments by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, created_at, updated_at FROM departments ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a department by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, created_at, updated_at FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn create(&self, name: &str) -> Result<Department, RepositoryError> {
        let result = sqlx::query("INSERT INTO departments (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("department id out of range: {e}"))
        })?;
        self.get(DepartmentId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Rename a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the department does not exist.
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn update(&self, id: DepartmentId, name: &str) -> Result<Department, RepositoryError> {
        sqlx::query("UPDATE departments SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the department does not exist.
    /// Returns `RepositoryError::Conflict` if department histories reference it.
    pub async fn delete(&self, id: DepartmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, NAME_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert a department unless one with the same name exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&self, name: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT IGNORE INTO departments (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
