//! Group home repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

use grouphome_core::GroupHomeId;

use super::{RepositoryError, corrupt_json, map_write_error};
use crate::models::group_home::{GroupHome, NewGroupHome};

#[derive(Debug, sqlx::FromRow)]
struct GroupHomeRow {
    id: i32,
    facility_code: String,
    name: String,
    unit_name: Option<String>,
    postal_code: Option<String>,
    address: String,
    phone_number: Option<String>,
    room_numbers: serde_json::Value,
    opened_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GroupHomeRow> for GroupHome {
    type Error = RepositoryError;

    fn try_from(row: GroupHomeRow) -> Result<Self, Self::Error> {
        let room_numbers: Vec<String> = serde_json::from_value(row.room_numbers)
            .map_err(|e| corrupt_json("group_homes.room_numbers", &e))?;
        Ok(Self {
            id: GroupHomeId::new(row.id),
            facility_code: row.facility_code,
            name: row.name,
            unit_name: row.unit_name,
            postal_code: row.postal_code,
            address: row.address,
            phone_number: row.phone_number,
            room_numbers,
            opened_on: row.opened_on,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const GROUP_HOME_COLUMNS: &str = "SELECT id, facility_code, name, unit_name, postal_code, \
     address, phone_number, room_numbers, opened_on, created_at, updated_at FROM group_homes";

/// Repository for group home database operations.
pub struct GroupHomeRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> GroupHomeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// List all group homes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a room list is invalid.
    pub async fn list(&self) -> Result<Vec<GroupHome>, RepositoryError> {
        let rows = sqlx::query_as::<_, GroupHomeRow>(&format!(
            "{GROUP_HOME_COLUMNS} ORDER BY facility_code, name"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a group home by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the room list is invalid.
    pub async fn get(&self, id: GroupHomeId) -> Result<Option<GroupHome>, RepositoryError> {
        let row = sqlx::query_as::<_, GroupHomeRow>(&format!("{GROUP_HOME_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a group home.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, home: &NewGroupHome) -> Result<GroupHome, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO group_homes (facility_code, name, unit_name, postal_code, address, \
             phone_number, room_numbers, opened_on) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&home.facility_code)
        .bind(&home.name)
        .bind(&home.unit_name)
        .bind(&home.postal_code)
        .bind(&home.address)
        .bind(&home.phone_number)
        .bind(Json(&home.room_numbers))
        .bind(home.opened_on)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "このグループホームは既に登録されています"))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("group home id out of range: {e}"))
        })?;
        self.get(GroupHomeId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Update a group home.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the home does not exist.
    pub async fn update(
        &self,
        id: GroupHomeId,
        home: &NewGroupHome,
    ) -> Result<GroupHome, RepositoryError> {
        sqlx::query(
            "UPDATE group_homes SET facility_code = ?, name = ?, unit_name = ?, postal_code = ?, \
             address = ?, phone_number = ?, room_numbers = ?, opened_on = ? WHERE id = ?",
        )
        .bind(&home.facility_code)
        .bind(&home.name)
        .bind(&home.unit_name)
        .bind(&home.postal_code)
        .bind(&home.address)
        .bind(&home.phone_number)
        .bind(Json(&home.room_numbers))
        .bind(home.opened_on)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| map_write_error(e, "このグループホームは既に登録されています"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a group home. Expansions are removed by cascade and residents
    /// are unassigned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the home does not exist.
    pub async fn delete(&self, id: GroupHomeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM group_homes WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_write_error(e, "削除できません"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
