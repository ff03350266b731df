//! Monthly shift preferences (シフト希望).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{GroupHomeId, ShiftPreferenceId, UserId, YearMonth};

use super::non_blank;

/// Desired number of days at one home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPreferenceEntry {
    pub group_home_id: GroupHomeId,
    pub desired_days: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPreference {
    pub id: ShiftPreferenceId,
    pub user_id: UserId,
    pub target_month: YearMonth,
    pub entries: Vec<ShiftPreferenceEntry>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShiftPreference {
    #[must_use]
    pub fn total_days(&self) -> u32 {
        self.entries.iter().map(|e| e.desired_days).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPreferenceInput {
    /// Defaults to the logged-in staff member.
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub target_month: String,
    #[serde(default)]
    pub entries: Vec<ShiftPreferenceEntry>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShiftPreference {
    pub user_id: UserId,
    pub target_month: YearMonth,
    pub entries: Vec<ShiftPreferenceEntry>,
    pub notes: Option<String>,
}

impl ShiftPreferenceInput {
    /// Validate the form for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self, user_id: UserId) -> Result<NewShiftPreference, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let month = errors.check("targetMonth", YearMonth::parse(&self.target_month));

        if self.entries.is_empty() {
            errors.add("entries", "希望するグループホームを1件以上入力してください");
        }

        let mut seen = BTreeSet::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if !seen.insert(entry.group_home_id) {
                errors.add(
                    format!("entries[{i}].groupHomeId"),
                    "同じグループホームが重複しています",
                );
            }
            if entry.desired_days == 0 {
                errors.add(
                    format!("entries[{i}].desiredDays"),
                    "希望日数は1日以上で入力してください",
                );
            }
            if let Some(month) = month
                && entry.desired_days > month.days()
            {
                errors.add(
                    format!("entries[{i}].desiredDays"),
                    format_args!("希望日数は{}日以内で入力してください", month.days()),
                );
            }
        }

        let total: u32 = self.entries.iter().map(|e| e.desired_days).sum();
        if let Some(month) = month
            && total > month.days()
        {
            errors.add(
                "entries",
                format_args!("希望日数の合計（{total}日）が{}の日数を超えています", month),
            );
        }

        if let Some(notes) = &self.notes {
            errors.max_chars("notes", "備考", notes, 1000);
        }

        errors.into_result()?;
        let target_month = month.ok_or_else(ValidationErrors::new)?;
        Ok(NewShiftPreference {
            user_id,
            target_month,
            entries: self.entries.clone(),
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPreferenceFilter {
    pub month: Option<YearMonth>,
    pub user_id: Option<UserId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(home: i32, days: u32) -> ShiftPreferenceEntry {
        ShiftPreferenceEntry {
            group_home_id: GroupHomeId::new(home),
            desired_days: days,
        }
    }

    fn input(month: &str, entries: Vec<ShiftPreferenceEntry>) -> ShiftPreferenceInput {
        ShiftPreferenceInput {
            user_id: None,
            target_month: month.to_owned(),
            entries,
            notes: Some("土日希望".to_owned()),
        }
    }

    #[test]
    fn test_valid_preference() {
        let pref = input("2025-02", vec![entry(1, 10), entry(2, 18)])
            .validate(UserId::new(3))
            .unwrap();
        assert_eq!(pref.target_month.to_string(), "2025-02");
        assert_eq!(pref.entries.len(), 2);
    }

    #[test]
    fn test_total_exceeds_days_in_month() {
        let errors = input("2025-02", vec![entry(1, 20), entry(2, 9)])
            .validate(UserId::new(3))
            .unwrap_err();
        assert!(errors.get("entries").is_some());
    }

    #[test]
    fn test_duplicate_home_and_zero_days() {
        let errors = input("2025-04", vec![entry(1, 5), entry(1, 0)])
            .validate(UserId::new(3))
            .unwrap_err();
        assert!(errors.get("entries[1].groupHomeId").is_some());
        assert!(errors.get("entries[1].desiredDays").is_some());
    }

    #[test]
    fn test_bad_month_and_no_entries() {
        let errors = input("2025/04", vec![]).validate(UserId::new(3)).unwrap_err();
        assert!(errors.get("targetMonth").is_some());
        assert!(errors.get("entries").is_some());
    }
}
