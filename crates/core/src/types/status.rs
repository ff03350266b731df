//! Active/inactive status derived from a terminal date.
//!
//! Residents become inactive on their move-out date and staff on their
//! retirement date. The status column in the database is kept for list
//! filtering, but the value shown is always recomputed from the date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a resident or staff member is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    /// Status string as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid status: {s}")),
        }
    }
}

/// Derive the status from a terminal date.
///
/// `Inactive` iff the date is present and not after `today`.
#[must_use]
pub fn derive_status(terminal_date: Option<NaiveDate>, today: NaiveDate) -> RecordStatus {
    match terminal_date {
        Some(date) if date <= today => RecordStatus::Inactive,
        _ => RecordStatus::Active,
    }
}

/// Result of comparing a stored status with the derived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheck {
    /// Status recomputed from the terminal date.
    pub status: RecordStatus,
    /// Status persisted in the database, if any.
    pub stored_status: Option<RecordStatus>,
}

impl StatusCheck {
    #[must_use]
    pub fn new(
        terminal_date: Option<NaiveDate>,
        stored_status: Option<RecordStatus>,
        today: NaiveDate,
    ) -> Self {
        Self {
            status: derive_status(terminal_date, today),
            stored_status,
        }
    }

    /// True when the stored value disagrees with the derived one.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        self.stored_status.is_some_and(|stored| stored != self.status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_move_out_in_past_is_inactive() {
        assert_eq!(
            derive_status(Some(date("2025-01-01")), date("2025-06-01")),
            RecordStatus::Inactive
        );
    }

    #[test]
    fn test_no_terminal_date_is_active() {
        assert_eq!(derive_status(None, date("2025-06-01")), RecordStatus::Active);
    }

    #[test]
    fn test_boundary_same_day_is_inactive() {
        assert_eq!(
            derive_status(Some(date("2025-06-01")), date("2025-06-01")),
            RecordStatus::Inactive
        );
        assert_eq!(
            derive_status(Some(date("2025-06-02")), date("2025-06-01")),
            RecordStatus::Active
        );
    }

    #[test]
    fn test_status_mismatch_flagged() {
        let check = StatusCheck::new(
            Some(date("2025-01-01")),
            Some(RecordStatus::Active),
            date("2025-06-01"),
        );
        assert!(check.is_mismatch());

        let check = StatusCheck::new(None, Some(RecordStatus::Active), date("2025-06-01"));
        assert!(!check.is_mismatch());

        let check = StatusCheck::new(None, None, date("2025-06-01"));
        assert!(!check.is_mismatch());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("inactive".parse::<RecordStatus>(), Ok(RecordStatus::Inactive));
        assert!("retired".parse::<RecordStatus>().is_err());
    }
}
