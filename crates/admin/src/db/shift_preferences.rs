//! Shift preference repository.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use grouphome_core::{ShiftPreferenceId, UserId, YearMonth};

use super::{RepositoryError, corrupt_json, map_write_error};
use crate::models::shift_preference::{
    NewShiftPreference, ShiftPreference, ShiftPreferenceEntry, ShiftPreferenceFilter,
};

#[derive(Debug, sqlx::FromRow)]
struct ShiftPreferenceRow {
    id: i32,
    user_id: i32,
    target_month: String,
    entries: serde_json::Value,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShiftPreferenceRow> for ShiftPreference {
    type Error = RepositoryError;

    fn try_from(row: ShiftPreferenceRow) -> Result<Self, Self::Error> {
        let target_month = YearMonth::parse(&row.target_month)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let entries: Vec<ShiftPreferenceEntry> = serde_json::from_value(row.entries)
            .map_err(|e| corrupt_json("shift_preferences.entries", &e))?;
        Ok(Self {
            id: ShiftPreferenceId::new(row.id),
            user_id: UserId::new(row.user_id),
            target_month,
            entries,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PREFERENCE_COLUMNS: &str = "SELECT id, user_id, target_month, entries, notes, created_at, \
     updated_at FROM shift_preferences";

const ALREADY_SUBMITTED: &str = "この月のシフト希望は既に提出されています";

/// Repository for shift preference database operations.
pub struct ShiftPreferenceRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ShiftPreferenceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List preferences matching `filter`, newest month first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list(
        &self,
        filter: &ShiftPreferenceFilter,
    ) -> Result<Vec<ShiftPreference>, RepositoryError> {
        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(PREFERENCE_COLUMNS);
        qb.push(" WHERE 1 = 1");
        if let Some(month) = filter.month {
            qb.push(" AND target_month = ").push_bind(month.to_string());
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        qb.push(" ORDER BY target_month DESC, user_id");

        let rows = qb
            .build_query_as::<ShiftPreferenceRow>()
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a preference by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get(
        &self,
        id: ShiftPreferenceId,
    ) -> Result<Option<ShiftPreference>, RepositoryError> {
        let row =
            sqlx::query_as::<_, ShiftPreferenceRow>(&format!("{PREFERENCE_COLUMNS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a preference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already submitted for
    /// the month.
    pub async fn create(
        &self,
        pref: &NewShiftPreference,
    ) -> Result<ShiftPreference, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO shift_preferences (user_id, target_month, entries, notes) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(pref.user_id)
        .bind(pref.target_month.to_string())
        .bind(Json(&pref.entries))
        .bind(&pref.notes)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, ALREADY_SUBMITTED))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("shift preference id out of range: {e}"))
        })?;
        self.get(ShiftPreferenceId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Update a preference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the preference does not exist.
    /// Returns `RepositoryError::Conflict` if the move collides with another
    /// month already submitted.
    pub async fn update(
        &self,
        id: ShiftPreferenceId,
        pref: &NewShiftPreference,
    ) -> Result<ShiftPreference, RepositoryError> {
        sqlx::query(
            "UPDATE shift_preferences SET user_id = ?, target_month = ?, entries = ?, notes = ? \
             WHERE id = ?",
        )
        .bind(pref.user_id)
        .bind(pref.target_month.to_string())
        .bind(Json(&pref.entries))
        .bind(&pref.notes)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, ALREADY_SUBMITTED))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a preference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the preference does not exist.
    pub async fn delete(&self, id: ShiftPreferenceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shift_preferences WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
