//! Attendance record repository.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use grouphome_core::{AttendanceRecordId, GroupHomeId, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::attendance::{AttendanceFilter, AttendanceRecord, NewAttendance};

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    id: i32,
    user_id: i32,
    work_date: NaiveDate,
    group_home_id: Option<i32>,
    clock_in: NaiveTime,
    clock_out: Option<NaiveTime>,
    break_minutes: i32,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = RepositoryError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let break_minutes = u32::try_from(row.break_minutes).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative break_minutes on attendance record {}",
                row.id
            ))
        })?;
        Ok(Self {
            id: AttendanceRecordId::new(row.id),
            user_id: UserId::new(row.user_id),
            work_date: row.work_date,
            group_home_id: row.group_home_id.map(GroupHomeId::new),
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            break_minutes,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ATTENDANCE_COLUMNS: &str = "SELECT id, user_id, work_date, group_home_id, clock_in, \
     clock_out, break_minutes, notes, created_at, updated_at FROM attendance_records";

/// Repository for attendance database operations.
pub struct AttendanceRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> AttendanceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List records matching `filter`, by date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(ATTENDANCE_COLUMNS);
        qb.push(" WHERE 1 = 1");
        if let Some(month) = filter.month {
            qb.push(" AND work_date BETWEEN ")
                .push_bind(month.first_day())
                .push(" AND ")
                .push_bind(month.last_day());
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        qb.push(" ORDER BY work_date, user_id, clock_in");

        let rows = qb
            .build_query_as::<AttendanceRow>()
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get(
        &self,
        id: AttendanceRecordId,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!("{ATTENDANCE_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user or home does not exist.
    pub async fn create(&self, record: &NewAttendance) -> Result<AttendanceRecord, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO attendance_records (user_id, work_date, group_home_id, clock_in, \
             clock_out, break_minutes, notes) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.work_date)
        .bind(record.group_home_id)
        .bind(record.clock_in)
        .bind(record.clock_out)
        .bind(record.break_minutes)
        .bind(&record.notes)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "この勤怠は既に登録されています"))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("attendance id out of range: {e}"))
        })?;
        self.get(AttendanceRecordId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Update a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the record does not exist.
    pub async fn update(
        &self,
        id: AttendanceRecordId,
        record: &NewAttendance,
    ) -> Result<AttendanceRecord, RepositoryError> {
        sqlx::query(
            "UPDATE attendance_records SET user_id = ?, work_date = ?, group_home_id = ?, \
             clock_in = ?, clock_out = ?, break_minutes = ?, notes = ? WHERE id = ?",
        )
        .bind(record.user_id)
        .bind(record.work_date)
        .bind(record.group_home_id)
        .bind(record.clock_in)
        .bind(record.clock_out)
        .bind(record.break_minutes)
        .bind(&record.notes)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "この勤怠は既に登録されています"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the record does not exist.
    pub async fn delete(&self, id: AttendanceRecordId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM attendance_records WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
