//! Room rosters and expansion (増床) rules.
//!
//! A group home starts with a list of base rooms. Expansion records add rooms
//! from their start date onward: type A declares a whole new unit (which must
//! have a common room), type B adds rooms to an existing unit.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;

/// Kind of expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpansionType {
    /// New unit with its own common room.
    A,
    /// Rooms added to an existing unit.
    B,
}

impl ExpansionType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for ExpansionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExpansionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            _ => Err(format!("invalid expansion type: {s}")),
        }
    }
}

/// Rooms added on a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAddition<'a> {
    pub start_date: NaiveDate,
    pub room_numbers: &'a [String],
}

/// Rooms of a group home in effect on `date`.
///
/// Base rooms plus the rooms of every expansion that started on or before
/// `date`, sorted and de-duplicated.
#[must_use]
pub fn roster_on<'a, I>(base_rooms: &[String], additions: I, date: NaiveDate) -> BTreeSet<String>
where
    I: IntoIterator<Item = RoomAddition<'a>>,
{
    let mut rooms: BTreeSet<String> = base_rooms.iter().map(|r| r.trim().to_owned()).collect();
    for addition in additions {
        if addition.start_date <= date {
            rooms.extend(addition.room_numbers.iter().map(|r| r.trim().to_owned()));
        }
    }
    rooms.retain(|r| !r.is_empty());
    rooms
}

/// Check a list of room identifiers entered on a form.
///
/// Rejects blank identifiers and duplicates inside the list.
pub fn check_room_list(errors: &mut ValidationErrors, field: &str, rooms: &[String]) {
    let mut seen = BTreeSet::new();
    for room in rooms {
        let room = room.trim();
        if room.is_empty() {
            errors.add(field, "部屋番号に空欄があります");
        } else if !seen.insert(room) {
            errors.add(field, format_args!("部屋番号「{room}」が重複しています"));
        }
    }
}

/// Expansion form contents to validate.
#[derive(Debug, Clone)]
pub struct ExpansionDraft<'a> {
    pub expansion_type: ExpansionType,
    pub unit_name: Option<&'a str>,
    pub common_room: Option<&'a str>,
    pub room_numbers: &'a [String],
}

impl ExpansionDraft<'_> {
    /// Validate the draft against the rooms the group home already has.
    ///
    /// `existing_rooms` is every room the home will have without this record
    /// (all base rooms and all other expansions, regardless of start date).
    #[must_use]
    pub fn validate(&self, existing_rooms: &BTreeSet<String>) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let blank = |v: Option<&str>| v.is_none_or(|s| s.trim().is_empty());

        if self.expansion_type == ExpansionType::A {
            if blank(self.unit_name) {
                errors.add("unitName", "新設するユニット名を入力してください");
            }
            if blank(self.common_room) {
                errors.add("commonRoom", "ユニット新設（A）には共用室の登録が必要です");
            }
        }

        if self.room_numbers.is_empty() {
            errors.add("roomNumbers", "追加する部屋番号を1件以上入力してください");
        }
        check_room_list(&mut errors, "roomNumbers", self.room_numbers);

        for room in self.room_numbers {
            let room = room.trim();
            if existing_rooms.contains(room) {
                errors.add("roomNumbers", format_args!("部屋番号「{room}」は既に登録されています"));
            }
        }

        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rooms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_roster_includes_started_expansions_only() {
        let base = rooms(&["101", "102"]);
        let first = rooms(&["103"]);
        let later = rooms(&["201", "202"]);
        let additions = || {
            [
                RoomAddition {
                    start_date: d("2024-04-01"),
                    room_numbers: &first,
                },
                RoomAddition {
                    start_date: d("2025-04-01"),
                    room_numbers: &later,
                },
            ]
        };

        let on = |date| roster_on(&base, additions(), d(date)).into_iter().collect::<Vec<_>>();
        assert_eq!(on("2024-03-31"), rooms(&["101", "102"]));
        assert_eq!(on("2024-04-01"), rooms(&["101", "102", "103"]));
        assert_eq!(on("2025-04-01"), rooms(&["101", "102", "103", "201", "202"]));
    }

    #[test]
    fn test_type_a_requires_unit_and_common_room() {
        let new_rooms = rooms(&["201"]);
        let draft = ExpansionDraft {
            expansion_type: ExpansionType::A,
            unit_name: None,
            common_room: Some(" "),
            room_numbers: &new_rooms,
        };
        let errors = draft.validate(&BTreeSet::new());
        assert!(errors.get("unitName").is_some());
        assert!(errors.get("commonRoom").is_some());
        assert!(errors.get("roomNumbers").is_none());
    }

    #[test]
    fn test_type_b_rejects_existing_and_duplicate_rooms() {
        let existing: BTreeSet<String> = rooms(&["101", "102"]).into_iter().collect();

        let dup = rooms(&["103", "103"]);
        let draft = ExpansionDraft {
            expansion_type: ExpansionType::B,
            unit_name: None,
            common_room: None,
            room_numbers: &dup,
        };
        assert!(draft.validate(&existing).get("roomNumbers").is_some());

        let clash = rooms(&["102"]);
        let draft = ExpansionDraft {
            room_numbers: &clash,
            ..draft
        };
        assert_eq!(
            draft.validate(&existing).get("roomNumbers"),
            Some("部屋番号「102」は既に登録されています")
        );

        let fine = rooms(&["103"]);
        let draft = ExpansionDraft {
            room_numbers: &fine,
            ..draft
        };
        assert!(draft.validate(&existing).is_empty());
    }

    #[test]
    fn test_empty_room_list_rejected() {
        let draft = ExpansionDraft {
            expansion_type: ExpansionType::B,
            unit_name: None,
            common_room: None,
            room_numbers: &[],
        };
        assert!(draft.validate(&BTreeSet::new()).get("roomNumbers").is_some());
    }
}
