//! Staff repository, including department history.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};

use grouphome_core::period::{self, Period};
use grouphome_core::{DepartmentHistoryId, DepartmentId, Email, RecordStatus, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::user::{DepartmentHistory, NewDepartmentHistory, NewUser, User, UserFilter};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role_name: String,
    hire_date: Option<NaiveDate>,
    retirement_date: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let status = row
            .status
            .parse::<RecordStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            role_name: row.role_name,
            hire_date: row.hire_date,
            retirement_date: row.retirement_date,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DepartmentHistoryRow {
    id: i32,
    user_id: i32,
    department_id: i32,
    department_name: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl TryFrom<DepartmentHistoryRow> for DepartmentHistory {
    type Error = RepositoryError;

    fn try_from(row: DepartmentHistoryRow) -> Result<Self, Self::Error> {
        let period = Period::new(row.start_date, row.end_date).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "department history {} ends before it starts",
                row.id
            ))
        })?;
        Ok(Self {
            id: DepartmentHistoryId::new(row.id),
            user_id: UserId::new(row.user_id),
            department_id: DepartmentId::new(row.department_id),
            department_name: row.department_name,
            period,
        })
    }
}

const USER_COLUMNS: &str = "SELECT u.id, u.name, u.email, u.role_name, u.hire_date, \
     u.retirement_date, u.status, u.created_at, u.updated_at FROM users u";

const HISTORY_COLUMNS: &str = "SELECT h.id, h.user_id, h.department_id, \
     d.name AS department_name, h.start_date, h.end_date \
     FROM department_histories h JOIN departments d ON d.id = h.department_id";

const EMAIL_TAKEN: &str = "このメールアドレスは既に登録されています";

async fn insert_histories(
    conn: &mut MySqlConnection,
    user_id: UserId,
    histories: &[NewDepartmentHistory],
) -> Result<(), RepositoryError> {
    for history in histories {
        sqlx::query(
            "INSERT INTO department_histories (user_id, department_id, start_date, end_date) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(history.department_id)
        .bind(history.period.start())
        .bind(history.period.end())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(e, "部署履歴を保存できません"))?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for staff database operations.
pub struct UserRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List staff matching `filter`.
    ///
    /// Status and department filters are evaluated as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(
        &self,
        filter: &UserFilter,
        today: NaiveDate,
    ) -> Result<Vec<User>, RepositoryError> {
        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(USER_COLUMNS);
        qb.push(" WHERE 1 = 1");

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{q}%");
            qb.push(" AND (u.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        match filter.status {
            Some(RecordStatus::Active) => {
                qb.push(" AND (u.retirement_date IS NULL OR u.retirement_date > ")
                    .push_bind(today)
                    .push(")");
            }
            Some(RecordStatus::Inactive) => {
                qb.push(" AND u.retirement_date <= ").push_bind(today);
            }
            None => {}
        }
        if let Some(department_id) = filter.department_id {
            qb.push(
                " AND EXISTS (SELECT 1 FROM department_histories h \
                 WHERE h.user_id = u.id AND h.department_id = ",
            )
            .push_bind(department_id)
            .push(" AND h.start_date <= ")
            .push_bind(today)
            .push(" AND (h.end_date IS NULL OR h.end_date >= ")
            .push_bind(today)
            .push("))");
        }
        qb.push(" ORDER BY u.id");

        let rows = qb.build_query_as::<UserRow>().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a staff member by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_COLUMNS} WHERE u.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a staff member by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_COLUMNS} WHERE u.email = ?"))
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a staff member with their department history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists or a
    /// referenced role or department is missing.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO users (name, email, role_name, hire_date, retirement_date, status) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.role_name)
        .bind(user.hire_date)
        .bind(user.retirement_date)
        .bind(user.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, EMAIL_TAKEN))?;

        let id = i32::try_from(result.last_insert_id())
            .map(UserId::new)
            .map_err(|e| RepositoryError::DataCorruption(format!("user id out of range: {e}")))?;

        if let Some(histories) = &user.department_histories {
            insert_histories(&mut *tx, id, histories).await?;
        }
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a staff member. Replaces the department history when the
    /// input carries one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` on a duplicate email.
    pub async fn update(&self, id: UserId, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, role_name = ?, hire_date = ?, \
             retirement_date = ?, status = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.role_name)
        .bind(user.hire_date)
        .bind(user.retirement_date)
        .bind(user.status.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, EMAIL_TAKEN))?;

        if let Some(histories) = &user.department_histories {
            sqlx::query("DELETE FROM department_histories WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_histories(&mut *tx, id, histories).await?;
        }
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a staff member. Department history is removed by cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, "削除できません"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Department history of one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored period is invalid.
    pub async fn histories(&self, user_id: UserId) -> Result<Vec<DepartmentHistory>, RepositoryError> {
        let rows = sqlx::query_as::<_, DepartmentHistoryRow>(&format!(
            "{HISTORY_COLUMNS} WHERE h.user_id = ? ORDER BY h.start_date"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Department histories of several users, grouped by user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored period is invalid.
    pub async fn histories_for(
        &self,
        user_ids: &[UserId],
    ) -> Result<BTreeMap<UserId, Vec<DepartmentHistory>>, RepositoryError> {
        let mut grouped: BTreeMap<UserId, Vec<DepartmentHistory>> = BTreeMap::new();
        if user_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(HISTORY_COLUMNS);
        qb.push(" WHERE h.user_id IN (");
        let mut ids = qb.separated(", ");
        for id in user_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");

        let rows = qb
            .build_query_as::<DepartmentHistoryRow>()
            .fetch_all(self.pool)
            .await?;
        for row in rows {
            let history = DepartmentHistory::try_from(row)?;
            grouped.entry(history.user_id).or_default().push(history);
        }
        for histories in grouped.values_mut() {
            period::sort_by_start(histories);
        }
        Ok(grouped)
    }

    /// Replace a user's whole department history atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if a department is missing.
    pub async fn replace_histories(
        &self,
        user_id: UserId,
        histories: &[NewDepartmentHistory],
    ) -> Result<Vec<DepartmentHistory>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = ? FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM department_histories WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        insert_histories(&mut *tx, user_id, histories).await?;
        tx.commit().await?;

        self.histories(user_id).await
    }
}
