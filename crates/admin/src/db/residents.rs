//! Resident repository, including disability-level history.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlConnection, MySqlExecutor, MySqlPool, QueryBuilder};

use grouphome_core::period::{self, Period};
use grouphome_core::{
    DisabilityHistoryId, DisabilityLevel, GroupHomeId, RecordStatus, ResidentId,
};

use super::{RepositoryError, map_write_error};
use crate::models::resident::{
    DisabilityHistory, NewDisabilityHistory, NewResident, Resident, ResidentFilter,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ResidentRow {
    id: i32,
    name: String,
    name_kana: Option<String>,
    group_home_id: Option<i32>,
    unit_name: Option<String>,
    room_number: Option<String>,
    move_in_date: Option<NaiveDate>,
    move_out_date: Option<NaiveDate>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ResidentRow> for Resident {
    type Error = RepositoryError;

    fn try_from(row: ResidentRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RecordStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: ResidentId::new(row.id),
            name: row.name,
            name_kana: row.name_kana,
            group_home_id: row.group_home_id.map(GroupHomeId::new),
            unit_name: row.unit_name,
            room_number: row.room_number,
            move_in_date: row.move_in_date,
            move_out_date: row.move_out_date,
            status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DisabilityHistoryRow {
    id: i32,
    resident_id: i32,
    disability_level: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl TryFrom<DisabilityHistoryRow> for DisabilityHistory {
    type Error = RepositoryError;

    fn try_from(row: DisabilityHistoryRow) -> Result<Self, Self::Error> {
        let level = row
            .disability_level
            .parse::<DisabilityLevel>()
            .map_err(RepositoryError::DataCorruption)?;
        let period = Period::new(row.start_date, row.end_date).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "disability history {} ends before it starts",
                row.id
            ))
        })?;
        Ok(Self {
            id: DisabilityHistoryId::new(row.id),
            resident_id: ResidentId::new(row.resident_id),
            level,
            period,
        })
    }
}

const RESIDENT_COLUMNS: &str = "SELECT r.id, r.name, r.name_kana, r.group_home_id, r.unit_name, \
     r.room_number, r.move_in_date, r.move_out_date, r.status, r.notes, r.created_at, \
     r.updated_at FROM residents r";

const HISTORY_COLUMNS: &str = "SELECT id, resident_id, disability_level, start_date, end_date \
     FROM disability_histories";

async fn insert_history(
    conn: &mut MySqlConnection,
    resident_id: ResidentId,
    history: &NewDisabilityHistory,
) -> Result<DisabilityHistoryId, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO disability_histories (resident_id, disability_level, start_date, end_date) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(resident_id)
    .bind(history.level.as_str())
    .bind(history.period.start())
    .bind(history.period.end())
    .execute(conn)
    .await
    .map_err(|e| map_write_error(e, "この履歴は既に登録されています"))?;

    let id = i32::try_from(result.last_insert_id()).map_err(|e| {
        RepositoryError::DataCorruption(format!("disability history id out of range: {e}"))
    })?;
    Ok(DisabilityHistoryId::new(id))
}

async fn insert_histories(
    conn: &mut MySqlConnection,
    resident_id: ResidentId,
    histories: &[NewDisabilityHistory],
) -> Result<(), RepositoryError> {
    for history in histories {
        insert_history(&mut *conn, resident_id, history).await?;
    }
    Ok(())
}

async fn load_histories(
    executor: impl MySqlExecutor<'_>,
    resident_id: ResidentId,
) -> Result<Vec<DisabilityHistory>, RepositoryError> {
    let rows = sqlx::query_as::<_, DisabilityHistoryRow>(&format!(
        "{HISTORY_COLUMNS} WHERE resident_id = ? ORDER BY start_date"
    ))
    .bind(resident_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

async fn lock_resident(conn: &mut MySqlConnection, id: ResidentId) -> Result<(), RepositoryError> {
    let exists = sqlx::query_scalar::<_, i32>("SELECT id FROM residents WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    exists.map(|_| ()).ok_or(RepositoryError::NotFound)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for resident database operations.
pub struct ResidentRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ResidentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List residents matching `filter`, with status evaluated as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(
        &self,
        filter: &ResidentFilter,
        today: NaiveDate,
    ) -> Result<Vec<Resident>, RepositoryError> {
        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(RESIDENT_COLUMNS);
        qb.push(" WHERE 1 = 1");

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{q}%");
            qb.push(" AND (r.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR r.name_kana LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        match filter.status {
            Some(RecordStatus::Active) => {
                qb.push(" AND (r.move_out_date IS NULL OR r.move_out_date > ")
                    .push_bind(today)
                    .push(")");
            }
            Some(RecordStatus::Inactive) => {
                qb.push(" AND r.move_out_date <= ").push_bind(today);
            }
            None => {}
        }
        if let Some(home) = filter.group_home_id {
            qb.push(" AND r.group_home_id = ").push_bind(home);
        }
        qb.push(" ORDER BY r.name_kana IS NULL, r.name_kana, r.name, r.id");

        let rows = qb.build_query_as::<ResidentRow>().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a resident by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get(&self, id: ResidentId) -> Result<Option<Resident>, RepositoryError> {
        let row = sqlx::query_as::<_, ResidentRow>(&format!("{RESIDENT_COLUMNS} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a resident with their disability history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the group home does not exist.
    pub async fn create(&self, resident: &NewResident) -> Result<Resident, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO residents (name, name_kana, group_home_id, unit_name, room_number, \
             move_in_date, move_out_date, status, notes) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&resident.name)
        .bind(&resident.name_kana)
        .bind(resident.group_home_id)
        .bind(&resident.unit_name)
        .bind(&resident.room_number)
        .bind(resident.move_in_date)
        .bind(resident.move_out_date)
        .bind(resident.status.as_str())
        .bind(&resident.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "この利用者は既に登録されています"))?;

        let id = i32::try_from(result.last_insert_id())
            .map(ResidentId::new)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("resident id out of range: {e}"))
            })?;

        if let Some(histories) = &resident.disability_histories {
            insert_histories(&mut *tx, id, histories).await?;
        }
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a resident. Replaces the disability history when the input
    /// carries one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the resident does not exist.
    pub async fn update(
        &self,
        id: ResidentId,
        resident: &NewResident,
    ) -> Result<Resident, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_resident(&mut *tx, id).await?;

        sqlx::query(
            "UPDATE residents SET name = ?, name_kana = ?, group_home_id = ?, unit_name = ?, \
             room_number = ?, move_in_date = ?, move_out_date = ?, status = ?, notes = ? \
             WHERE id = ?",
        )
        .bind(&resident.name)
        .bind(&resident.name_kana)
        .bind(resident.group_home_id)
        .bind(&resident.unit_name)
        .bind(&resident.room_number)
        .bind(resident.move_in_date)
        .bind(resident.move_out_date)
        .bind(resident.status.as_str())
        .bind(&resident.notes)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "この利用者は既に登録されています"))?;

        if let Some(histories) = &resident.disability_histories {
            sqlx::query("DELETE FROM disability_histories WHERE resident_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_histories(&mut *tx, id, histories).await?;
        }
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a resident with their histories and usage records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the resident does not exist.
    pub async fn delete(&self, id: ResidentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM residents WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Disability history of one resident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored entry is invalid.
    pub async fn histories(
        &self,
        resident_id: ResidentId,
    ) -> Result<Vec<DisabilityHistory>, RepositoryError> {
        load_histories(self.pool, resident_id).await
    }

    /// Disability histories of several residents, grouped by resident.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored entry is invalid.
    pub async fn histories_for(
        &self,
        resident_ids: &[ResidentId],
    ) -> Result<BTreeMap<ResidentId, Vec<DisabilityHistory>>, RepositoryError> {
        let mut grouped: BTreeMap<ResidentId, Vec<DisabilityHistory>> = BTreeMap::new();
        if resident_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(HISTORY_COLUMNS);
        qb.push(" WHERE resident_id IN (");
        let mut ids = qb.separated(", ");
        for id in resident_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let rows = qb
            .build_query_as::<DisabilityHistoryRow>()
            .fetch_all(self.pool)
            .await?;
        for row in rows {
            let history = DisabilityHistory::try_from(row)?;
            grouped.entry(history.resident_id).or_default().push(history);
        }
        for histories in grouped.values_mut() {
            period::sort_by_start(histories);
        }
        Ok(grouped)
    }

    /// Get one disability history entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the entry is invalid.
    pub async fn history(
        &self,
        id: DisabilityHistoryId,
    ) -> Result<Option<DisabilityHistory>, RepositoryError> {
        let row = sqlx::query_as::<_, DisabilityHistoryRow>(&format!("{HISTORY_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Replace a resident's whole disability history atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the resident does not exist.
    pub async fn replace_histories(
        &self,
        resident_id: ResidentId,
        histories: &[NewDisabilityHistory],
    ) -> Result<Vec<DisabilityHistory>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_resident(&mut *tx, resident_id).await?;

        sqlx::query("DELETE FROM disability_histories WHERE resident_id = ?")
            .bind(resident_id)
            .execute(&mut *tx)
            .await?;
        insert_histories(&mut *tx, resident_id, histories).await?;
        tx.commit().await?;

        self.histories(resident_id).await
    }

    /// Add a single disability history entry.
    ///
    /// The resident row is locked while `check` validates the entry against
    /// the stored history, so concurrent additions are checked one at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the resident does not exist,
    /// or whatever `check` rejects the entry with.
    pub async fn add_history<E, F>(
        &self,
        resident_id: ResidentId,
        check: F,
    ) -> Result<DisabilityHistory, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&[DisabilityHistory]) -> Result<NewDisabilityHistory, E>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        lock_resident(&mut *tx, resident_id).await?;

        let existing = load_histories(&mut *tx, resident_id).await?;
        let history = check(&existing)?;
        let id = insert_history(&mut *tx, resident_id, &history).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        self.history(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// Update a single disability history entry of `resident_id`.
    ///
    /// Locked and checked like [`Self::add_history`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry does not exist under
    /// the resident, or whatever `check` rejects the entry with.
    pub async fn update_history<E, F>(
        &self,
        resident_id: ResidentId,
        id: DisabilityHistoryId,
        check: F,
    ) -> Result<DisabilityHistory, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&[DisabilityHistory]) -> Result<NewDisabilityHistory, E>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        lock_resident(&mut *tx, resident_id).await?;

        let existing = load_histories(&mut *tx, resident_id).await?;
        if !existing.iter().any(|h| h.id == id) {
            return Err(RepositoryError::NotFound.into());
        }
        let history = check(&existing)?;
        sqlx::query(
            "UPDATE disability_histories SET disability_level = ?, start_date = ?, end_date = ? \
             WHERE id = ?",
        )
        .bind(history.level.as_str())
        .bind(history.period.start())
        .bind(history.period.end())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "この履歴は既に登録されています"))?;
        tx.commit().await.map_err(RepositoryError::from)?;

        self.history(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// Delete a single disability history entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry does not exist.
    pub async fn delete_history(&self, id: DisabilityHistoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM disability_histories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
