//! Export command.
//!
//! Reads a list endpoint from a running server and writes the rows as a JSON
//! array with the database's snake_case field names.

use std::path::Path;

use clap::ValueEnum;
use serde_json::Value;

use grouphome_admin::client::ApiClient;
use grouphome_core::YearMonth;
use grouphome_core::case::keys_to_snake;

use super::CommandError;

/// Entities that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Entity {
    Users,
    Departments,
    Roles,
    GroupHomes,
    Expansions,
    Residents,
    ShiftPreferences,
    UsageRecords,
    Attendance,
}

impl Entity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Departments => "departments",
            Self::Roles => "roles",
            Self::GroupHomes => "group homes",
            Self::Expansions => "expansions",
            Self::Residents => "residents",
            Self::ShiftPreferences => "shift preferences",
            Self::UsageRecords => "usage records",
            Self::Attendance => "attendance",
        }
    }

    /// The list endpoint for this entity.
    ///
    /// # Errors
    ///
    /// Usage records are listed per month and fail without one; an invalid
    /// month fails for every entity that takes it.
    pub fn path(self, month: Option<&str>) -> Result<String, CommandError> {
        let month = month
            .map(YearMonth::parse)
            .transpose()
            .map_err(|e| CommandError::Validation(("month", e.to_string()).into()))?;

        let base = match self {
            Self::Users => "/api/users",
            Self::Departments => "/api/departments",
            Self::Roles => "/api/roles",
            Self::GroupHomes => "/api/group-homes",
            Self::Expansions => "/api/expansions",
            Self::Residents => "/api/residents",
            Self::ShiftPreferences => "/api/shift_preferences",
            Self::Attendance => "/api/attendance",
            Self::UsageRecords => {
                let month = month.ok_or(CommandError::MonthRequired(self.label()))?;
                return Ok(format!("/api/usage_records?month={month}"));
            }
        };
        Ok(match (self, month) {
            (Self::ShiftPreferences | Self::Attendance, Some(month)) => {
                format!("{base}?month={month}")
            }
            _ => base.to_owned(),
        })
    }
}

/// Export `entity` from the server at `server` into `out`.
///
/// # Returns
///
/// The number of rows written.
///
/// # Errors
///
/// Returns an error if the server cannot be read after retries or the file
/// cannot be written.
pub async fn run(
    entity: Entity,
    out: &Path,
    server: &str,
    month: Option<&str>,
) -> Result<usize, CommandError> {
    let client = ApiClient::new(server)?;
    let path = entity.path(month)?;

    tracing::info!(entity = entity.label(), %path, "Exporting");
    let rows: Vec<Value> = client
        .list(&path)
        .await?
        .into_iter()
        .map(keys_to_snake)
        .collect();

    tokio::fs::write(out, serde_json::to_vec_pretty(&rows)?).await?;
    tracing::info!(rows = rows.len(), out = %out.display(), "Export complete!");
    Ok(rows.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Entity::GroupHomes.path(None).unwrap(), "/api/group-homes");
        assert_eq!(
            Entity::Attendance.path(Some("2025-04")).unwrap(),
            "/api/attendance?month=2025-04"
        );
        assert_eq!(
            Entity::Residents.path(Some("2025-04")).unwrap(),
            "/api/residents"
        );
    }

    #[test]
    fn test_usage_records_need_a_month() {
        assert!(matches!(
            Entity::UsageRecords.path(None),
            Err(CommandError::MonthRequired(_))
        ));
        assert_eq!(
            Entity::UsageRecords.path(Some("2025-04")).unwrap(),
            "/api/usage_records?month=2025-04"
        );
    }

    #[test]
    fn test_bad_month_is_rejected() {
        assert!(matches!(
            Entity::Attendance.path(Some("2025-13")),
            Err(CommandError::Validation(_))
        ));
    }
}
