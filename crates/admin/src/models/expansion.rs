//! Expansion (増床) records.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::rooms::{ExpansionDraft, ExpansionType, RoomAddition};
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{ExpansionId, GroupHomeId};

use super::non_blank;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expansion {
    pub id: ExpansionId,
    pub group_home_id: GroupHomeId,
    pub expansion_type: ExpansionType,
    pub unit_name: Option<String>,
    pub common_room: Option<String>,
    pub room_numbers: Vec<String>,
    pub start_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expansion {
    #[must_use]
    pub fn as_addition(&self) -> RoomAddition<'_> {
        RoomAddition {
            start_date: self.start_date,
            room_numbers: &self.room_numbers,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionInput {
    pub group_home_id: Option<GroupHomeId>,
    #[serde(default)]
    pub expansion_type: String,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub common_room: Option<String>,
    #[serde(default)]
    pub room_numbers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpansion {
    pub group_home_id: GroupHomeId,
    pub expansion_type: ExpansionType,
    pub unit_name: Option<String>,
    pub common_room: Option<String>,
    pub room_numbers: Vec<String>,
    pub start_date: NaiveDate,
    pub notes: Option<String>,
}

impl ExpansionInput {
    /// Validate against the home's other rooms.
    ///
    /// `existing_rooms` holds the base rooms and the rooms of every other
    /// expansion of the same home.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self, existing_rooms: &BTreeSet<String>) -> Result<NewExpansion, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.group_home_id.is_none() {
            errors.add("groupHomeId", "グループホームを選択してください");
        }
        if self.start_date.is_none() {
            errors.add("startDate", "開始日を入力してください");
        }
        let expansion_type = errors.check(
            "expansionType",
            self.expansion_type
                .parse::<ExpansionType>()
                .map_err(|_| "増床区分は A または B を選択してください"),
        );

        if let Some(expansion_type) = expansion_type {
            let draft = ExpansionDraft {
                expansion_type,
                unit_name: self.unit_name.as_deref(),
                common_room: self.common_room.as_deref(),
                room_numbers: &self.room_numbers,
            };
            for (field, message) in draft.validate(existing_rooms).iter() {
                errors.add(field, message);
            }
        }

        errors.into_result()?;
        match (self.group_home_id, expansion_type, self.start_date) {
            (Some(group_home_id), Some(expansion_type), Some(start_date)) => Ok(NewExpansion {
                group_home_id,
                expansion_type,
                unit_name: non_blank(self.unit_name.as_deref()),
                common_room: non_blank(self.common_room.as_deref()),
                room_numbers: self.room_numbers.iter().map(|r| r.trim().to_owned()).collect(),
                start_date,
                notes: non_blank(self.notes.as_deref()),
            }),
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionFilter {
    pub group_home_id: Option<GroupHomeId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(kind: &str) -> ExpansionInput {
        ExpansionInput {
            group_home_id: Some(GroupHomeId::new(1)),
            expansion_type: kind.to_owned(),
            unit_name: None,
            common_room: None,
            room_numbers: vec!["201".to_owned()],
            start_date: Some("2025-04-01".parse().unwrap()),
            notes: None,
        }
    }

    #[test]
    fn test_type_b_accepted() {
        let existing = BTreeSet::from(["101".to_owned()]);
        let expansion = input("B").validate(&existing).unwrap();
        assert_eq!(expansion.expansion_type, ExpansionType::B);
    }

    #[test]
    fn test_type_a_needs_common_room() {
        let mut form = input("A");
        form.unit_name = Some("2階ユニット".to_owned());
        let errors = form.validate(&BTreeSet::new()).unwrap_err();
        assert!(errors.get("commonRoom").is_some());
        assert!(errors.get("unitName").is_none());
    }

    #[test]
    fn test_unknown_type_and_missing_fields() {
        let form = ExpansionInput {
            group_home_id: None,
            start_date: None,
            ..input("C")
        };
        let errors = form.validate(&BTreeSet::new()).unwrap_err();
        assert!(errors.get("expansionType").is_some());
        assert!(errors.get("groupHomeId").is_some());
        assert!(errors.get("startDate").is_some());
    }
}
