//! Expansion repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

use grouphome_core::rooms::ExpansionType;
use grouphome_core::{ExpansionId, GroupHomeId};

use super::{RepositoryError, corrupt_json, map_write_error};
use crate::models::expansion::{Expansion, NewExpansion};

#[derive(Debug, sqlx::FromRow)]
struct ExpansionRow {
    id: i32,
    group_home_id: i32,
    expansion_type: String,
    unit_name: Option<String>,
    common_room: Option<String>,
    room_numbers: serde_json::Value,
    start_date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExpansionRow> for Expansion {
    type Error = RepositoryError;

    fn try_from(row: ExpansionRow) -> Result<Self, Self::Error> {
        let expansion_type = row
            .expansion_type
            .parse::<ExpansionType>()
            .map_err(RepositoryError::DataCorruption)?;
        let room_numbers: Vec<String> = serde_json::from_value(row.room_numbers)
            .map_err(|e| corrupt_json("expansions.room_numbers", &e))?;
        Ok(Self {
            id: ExpansionId::new(row.id),
            group_home_id: GroupHomeId::new(row.group_home_id),
            expansion_type,
            unit_name: row.unit_name,
            common_room: row.common_room,
            room_numbers,
            start_date: row.start_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const EXPANSION_COLUMNS: &str = "SELECT id, group_home_id, expansion_type, unit_name, \
     common_room, room_numbers, start_date, notes, created_at, updated_at FROM expansions";

/// Repository for expansion database operations.
pub struct ExpansionRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ExpansionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List expansions, optionally for one home, by start date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list(
        &self,
        group_home_id: Option<GroupHomeId>,
    ) -> Result<Vec<Expansion>, RepositoryError> {
        let rows = match group_home_id {
            Some(home) => {
                sqlx::query_as::<_, ExpansionRow>(&format!(
                    "{EXPANSION_COLUMNS} WHERE group_home_id = ? ORDER BY start_date, id"
                ))
                .bind(home)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ExpansionRow>(&format!(
                    "{EXPANSION_COLUMNS} ORDER BY group_home_id, start_date, id"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an expansion by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get(&self, id: ExpansionId) -> Result<Option<Expansion>, RepositoryError> {
        let row = sqlx::query_as::<_, ExpansionRow>(&format!("{EXPANSION_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create an expansion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the group home does not exist.
    pub async fn create(&self, expansion: &NewExpansion) -> Result<Expansion, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO expansions (group_home_id, expansion_type, unit_name, common_room, \
             room_numbers, start_date, notes) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expansion.group_home_id)
        .bind(expansion.expansion_type.as_str())
        .bind(&expansion.unit_name)
        .bind(&expansion.common_room)
        .bind(Json(&expansion.room_numbers))
        .bind(expansion.start_date)
        .bind(&expansion.notes)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "この増床は既に登録されています"))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("expansion id out of range: {e}"))
        })?;
        self.get(ExpansionId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Update an expansion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the expansion does not exist.
    pub async fn update(
        &self,
        id: ExpansionId,
        expansion: &NewExpansion,
    ) -> Result<Expansion, RepositoryError> {
        sqlx::query(
            "UPDATE expansions SET group_home_id = ?, expansion_type = ?, unit_name = ?, \
             common_room = ?, room_numbers = ?, start_date = ?, notes = ? WHERE id = ?",
        )
        .bind(expansion.group_home_id)
        .bind(expansion.expansion_type.as_str())
        .bind(&expansion.unit_name)
        .bind(&expansion.common_room)
        .bind(Json(&expansion.room_numbers))
        .bind(expansion.start_date)
        .bind(&expansion.notes)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "この増床は既に登録されています"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an expansion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the expansion does not exist.
    pub async fn delete(&self, id: ExpansionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expansions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
