//! Usage record repository.

use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use grouphome_core::{DisabilityLevel, ResidentId, UsageRecordId, YearMonth};

use super::{RepositoryError, map_write_error};
use crate::models::usage_record::{NewUsageRecord, UsageRecord};

#[derive(Debug, sqlx::FromRow)]
struct UsageRecordRow {
    id: i32,
    resident_id: i32,
    usage_date: NaiveDate,
    used: bool,
    disability_level: Option<String>,
}

impl TryFrom<UsageRecordRow> for UsageRecord {
    type Error = RepositoryError;

    fn try_from(row: UsageRecordRow) -> Result<Self, Self::Error> {
        let disability_level = row
            .disability_level
            .as_deref()
            .map(str::parse::<DisabilityLevel>)
            .transpose()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: UsageRecordId::new(row.id),
            resident_id: ResidentId::new(row.resident_id),
            usage_date: row.usage_date,
            used: row.used,
            disability_level,
        })
    }
}

const RECORD_COLUMNS: &str =
    "SELECT id, resident_id, usage_date, used, disability_level FROM usage_records";

/// Repository for usage record database operations.
pub struct UsageRecordRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UsageRecordRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Records for a month, optionally for one resident.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored level is invalid.
    pub async fn list_month(
        &self,
        month: YearMonth,
        resident_id: Option<ResidentId>,
    ) -> Result<Vec<UsageRecord>, RepositoryError> {
        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(RECORD_COLUMNS);
        qb.push(" WHERE usage_date BETWEEN ")
            .push_bind(month.first_day())
            .push(" AND ")
            .push_bind(month.last_day());
        if let Some(resident_id) = resident_id {
            qb.push(" AND resident_id = ").push_bind(resident_id);
        }
        qb.push(" ORDER BY resident_id, usage_date");

        let rows = qb
            .build_query_as::<UsageRecordRow>()
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Upsert one resident's days in a single transaction.
    ///
    /// Existing records for the same dates are overwritten; other dates are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the resident does not exist.
    pub async fn upsert_month(
        &self,
        resident_id: ResidentId,
        month: YearMonth,
        records: &[NewUsageRecord],
    ) -> Result<Vec<UsageRecord>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO usage_records (resident_id, usage_date, used, disability_level) \
                 VALUES (?, ?, ?, ?) \
                 ON DUPLICATE KEY UPDATE used = VALUES(used), \
                 disability_level = VALUES(disability_level)",
            )
            .bind(resident_id)
            .bind(record.usage_date)
            .bind(record.used)
            .bind(record.disability_level.map(|l| l.as_str()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "利用実績を保存できません"))?;
        }
        tx.commit().await?;

        self.list_month(month, Some(resident_id)).await
    }
}
