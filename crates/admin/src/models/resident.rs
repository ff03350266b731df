//! Resident domain types and disability-level history.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::period::{self, Dated, HistoryConflict, Period};
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{
    DisabilityHistoryId, DisabilityLevel, GroupHomeId, RecordStatus, ResidentId, StatusCheck,
    derive_status,
};

use super::non_blank;

/// A resident (domain type).
#[derive(Debug, Clone)]
pub struct Resident {
    pub id: ResidentId,
    pub name: String,
    pub name_kana: Option<String>,
    pub group_home_id: Option<GroupHomeId>,
    pub unit_name: Option<String>,
    pub room_number: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resident {
    /// Whether the resident lived in the home on `date`.
    #[must_use]
    pub fn resided_on(&self, date: NaiveDate) -> bool {
        self.move_in_date.is_none_or(|d| d <= date) && self.move_out_date.is_none_or(|d| date <= d)
    }
}

/// One period at a support level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabilityHistory {
    pub id: DisabilityHistoryId,
    pub resident_id: ResidentId,
    pub level: DisabilityLevel,
    pub period: Period,
}

impl Dated for DisabilityHistory {
    fn period(&self) -> Period {
        self.period
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabilityHistoryView {
    pub id: DisabilityHistoryId,
    pub resident_id: ResidentId,
    pub disability_level: DisabilityLevel,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<&DisabilityHistory> for DisabilityHistoryView {
    fn from(h: &DisabilityHistory) -> Self {
        Self {
            id: h.id,
            resident_id: h.resident_id,
            disability_level: h.level,
            start_date: h.period.start(),
            end_date: h.period.end(),
        }
    }
}

/// Resident as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentView {
    pub id: ResidentId,
    pub name: String,
    pub name_kana: Option<String>,
    pub group_home_id: Option<GroupHomeId>,
    pub unit_name: Option<String>,
    pub room_number: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub stored_status: RecordStatus,
    pub status_mismatch: bool,
    pub current_disability_level: Option<DisabilityLevel>,
    pub disability_histories: Vec<DisabilityHistoryView>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResidentView {
    #[must_use]
    pub fn new(resident: Resident, histories: &[DisabilityHistory], today: NaiveDate) -> Self {
        let check = StatusCheck::new(resident.move_out_date, Some(resident.status), today);
        Self {
            id: resident.id,
            name: resident.name,
            name_kana: resident.name_kana,
            group_home_id: resident.group_home_id,
            unit_name: resident.unit_name,
            room_number: resident.room_number,
            move_in_date: resident.move_in_date,
            move_out_date: resident.move_out_date,
            status: check.status,
            stored_status: resident.status,
            status_mismatch: check.is_mismatch(),
            current_disability_level: period::entry_on(histories, today).map(|h| h.level),
            disability_histories: histories.iter().map(Into::into).collect(),
            notes: resident.notes,
            created_at: resident.created_at,
            updated_at: resident.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabilityHistoryInput {
    #[serde(default)]
    pub disability_level: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDisabilityHistory {
    pub level: DisabilityLevel,
    pub period: Period,
}

fn parse_level(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<DisabilityLevel> {
    errors.check(
        field,
        raw.parse::<DisabilityLevel>()
            .map_err(|_| "障害支援区分を選択してください"),
    )
}

fn check_disability_histories(
    errors: &mut ValidationErrors,
    rows: &[DisabilityHistoryInput],
) -> Option<Vec<NewDisabilityHistory>> {
    let levels: Vec<_> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            parse_level(
                errors,
                &format!("disabilityHistories[{i}].disabilityLevel"),
                &row.disability_level,
            )
        })
        .collect();
    let raw: Vec<_> = rows.iter().map(|r| (r.start_date, r.end_date)).collect();
    let periods = period::validate_history_input(errors, "disabilityHistories", &raw)?;
    levels
        .into_iter()
        .zip(periods)
        .map(|(level, period)| level.map(|level| NewDisabilityHistory { level, period }))
        .collect()
}

/// Validate a proposed disability history list as a whole.
///
/// # Errors
///
/// Returns field errors keyed `disabilityHistories[i]` for invalid or
/// conflicting entries.
pub fn validate_disability_histories(
    rows: &[DisabilityHistoryInput],
) -> Result<Vec<NewDisabilityHistory>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let histories = check_disability_histories(&mut errors, rows);
    errors.into_result()?;
    Ok(histories.unwrap_or_default())
}

/// A single disability history entry submitted on its own.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabilityHistoryEntryInput {
    pub resident_id: Option<ResidentId>,
    #[serde(default)]
    pub disability_level: String,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl DisabilityHistoryEntryInput {
    /// Validate one entry against the resident's stored entries.
    ///
    /// `editing` is the entry being replaced, skipped in the overlap check.
    ///
    /// # Errors
    ///
    /// Returns field errors, including an overlap with a stored entry.
    pub fn validate(
        &self,
        editing: Option<DisabilityHistoryId>,
        existing: &[DisabilityHistory],
    ) -> Result<NewDisabilityHistory, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let level = parse_level(&mut errors, "disabilityLevel", &self.disability_level);
        let Some(start) = self.start_date else {
            errors.add("startDate", "開始日を入力してください");
            return Err(errors);
        };
        let period = errors.check("endDate", Period::new(start, self.end_date));

        if let Some(period) = period
            && let Err(conflict) =
                period::check_candidate(&period, editing, existing.iter().map(|h| (h.id, h.period)))
        {
            let field = match conflict {
                HistoryConflict::MultipleOpen => "endDate",
                HistoryConflict::Overlap { .. } => "startDate",
            };
            errors.add(field, conflict);
        }

        errors.into_result()?;
        match (level, period) {
            (Some(level), Some(period)) => Ok(NewDisabilityHistory { level, period }),
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_kana: Option<String>,
    #[serde(default)]
    pub group_home_id: Option<GroupHomeId>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub move_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub move_out_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// When present, replaces the whole disability history.
    #[serde(default)]
    pub disability_histories: Option<Vec<DisabilityHistoryInput>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResident {
    pub name: String,
    pub name_kana: Option<String>,
    pub group_home_id: Option<GroupHomeId>,
    pub unit_name: Option<String>,
    pub room_number: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub notes: Option<String>,
    pub disability_histories: Option<Vec<NewDisabilityHistory>>,
}

impl ResidentInput {
    /// The date whose room roster the assignment must match.
    #[must_use]
    pub fn roster_date(&self, today: NaiveDate) -> NaiveDate {
        self.move_in_date.unwrap_or(today)
    }

    /// Validate the form.
    ///
    /// `roster` is the home's room roster on [`Self::roster_date`], looked up
    /// by the caller when a home is selected.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(
        &self,
        roster: Option<&BTreeSet<String>>,
        today: NaiveDate,
    ) -> Result<NewResident, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let room_number = non_blank(self.room_number.as_deref());

        errors.require("name", "氏名", &self.name);
        errors.max_chars("name", "氏名", self.name.trim(), 100);
        if let Some(kana) = &self.name_kana {
            errors.max_chars("nameKana", "ふりがな", kana.trim(), 100);
        }

        if let (Some(move_in), Some(move_out)) = (self.move_in_date, self.move_out_date)
            && move_out < move_in
        {
            errors.add("moveOutDate", "退去日は入居日以降の日付を入力してください");
        }

        if let Some(room) = &room_number {
            match (self.group_home_id, roster) {
                (None, _) => errors.add("groupHomeId", "部屋を指定する場合はグループホームを選択してください"),
                (Some(_), Some(rooms)) if !rooms.contains(room) => errors.add(
                    "roomNumber",
                    format_args!(
                        "部屋番号「{room}」は{}時点で登録されていません",
                        self.roster_date(today)
                    ),
                ),
                _ => {}
            }
        }

        let histories = self
            .disability_histories
            .as_deref()
            .map(|rows| check_disability_histories(&mut errors, rows));

        errors.into_result()?;
        Ok(NewResident {
            name: self.name.trim().to_owned(),
            name_kana: non_blank(self.name_kana.as_deref()),
            group_home_id: self.group_home_id,
            unit_name: non_blank(self.unit_name.as_deref()),
            room_number,
            move_in_date: self.move_in_date,
            move_out_date: self.move_out_date,
            status: derive_status(self.move_out_date, today),
            notes: non_blank(self.notes.as_deref()),
            disability_histories: histories.map(Option::unwrap_or_default),
        })
    }
}

/// List filters for `GET /api/residents`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentFilter {
    /// Substring of name or kana.
    pub q: Option<String>,
    pub status: Option<RecordStatus>,
    pub group_home_id: Option<GroupHomeId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn resident(move_out: Option<&str>) -> Resident {
        Resident {
            id: ResidentId::new(1),
            name: "田中 太郎".to_owned(),
            name_kana: Some("たなか たろう".to_owned()),
            group_home_id: Some(GroupHomeId::new(1)),
            unit_name: None,
            room_number: Some("101".to_owned()),
            move_in_date: Some(d("2020-04-01")),
            move_out_date: move_out.map(d),
            status: RecordStatus::Active,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn history(id: i32, level: DisabilityLevel, start: &str, end: Option<&str>) -> DisabilityHistory {
        DisabilityHistory {
            id: DisabilityHistoryId::new(id),
            resident_id: ResidentId::new(1),
            level,
            period: Period::new(d(start), end.map(d)).unwrap(),
        }
    }

    fn input() -> ResidentInput {
        ResidentInput {
            name: "田中 太郎".to_owned(),
            name_kana: None,
            group_home_id: Some(GroupHomeId::new(1)),
            unit_name: None,
            room_number: Some("101".to_owned()),
            move_in_date: Some(d("2024-04-01")),
            move_out_date: None,
            notes: None,
            disability_histories: None,
        }
    }

    #[test]
    fn test_moved_out_resident_is_inactive() {
        let view = ResidentView::new(resident(Some("2025-01-01")), &[], d("2025-06-01"));
        assert_eq!(view.status, RecordStatus::Inactive);
        assert!(view.status_mismatch);

        let view = ResidentView::new(resident(None), &[], d("2025-06-01"));
        assert_eq!(view.status, RecordStatus::Active);
        assert!(!view.status_mismatch);
    }

    #[test]
    fn test_current_level_from_history() {
        let histories = [
            history(1, DisabilityLevel::Three, "2022-01-01", Some("2023-12-31")),
            history(2, DisabilityLevel::Four, "2024-01-01", None),
        ];
        let view = ResidentView::new(resident(None), &histories, d("2025-06-01"));
        assert_eq!(view.current_disability_level, Some(DisabilityLevel::Four));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["disabilityHistories"][0]["disabilityLevel"], "3");
        assert_eq!(json["currentDisabilityLevel"], "4");
    }

    #[test]
    fn test_second_open_entry_conflicts() {
        let existing = [history(1, DisabilityLevel::Three, "2023-01-01", None)];
        let entry = DisabilityHistoryEntryInput {
            resident_id: Some(ResidentId::new(1)),
            disability_level: "4".to_owned(),
            start_date: Some(d("2024-01-01")),
            end_date: None,
        };
        let errors = entry.validate(None, &existing).unwrap_err();
        assert!(errors.get("endDate").is_some());

        // Editing the open entry itself is not a conflict.
        let ok = entry.validate(Some(DisabilityHistoryId::new(1)), &existing);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_entry_overlapping_closed_period() {
        let existing = [history(1, DisabilityLevel::Three, "2023-01-01", Some("2023-12-31"))];
        let entry = DisabilityHistoryEntryInput {
            resident_id: Some(ResidentId::new(1)),
            disability_level: "1以下".to_owned(),
            start_date: Some(d("2023-12-31")),
            end_date: None,
        };
        let errors = entry.validate(None, &existing).unwrap_err();
        assert!(errors.get("startDate").is_some());
    }

    #[test]
    fn test_room_must_be_in_roster() {
        let roster = BTreeSet::from(["101".to_owned(), "102".to_owned()]);
        assert!(input().validate(Some(&roster), d("2025-06-01")).is_ok());

        let form = ResidentInput {
            room_number: Some("201".to_owned()),
            ..input()
        };
        let errors = form.validate(Some(&roster), d("2025-06-01")).unwrap_err();
        assert!(errors.get("roomNumber").is_some());

        let form = ResidentInput {
            group_home_id: None,
            ..input()
        };
        let errors = form.validate(None, d("2025-06-01")).unwrap_err();
        assert!(errors.get("groupHomeId").is_some());
    }

    #[test]
    fn test_histories_validated_with_levels() {
        let form = ResidentInput {
            disability_histories: Some(vec![
                DisabilityHistoryInput {
                    disability_level: "7".to_owned(),
                    start_date: d("2023-01-01"),
                    end_date: Some(d("2023-12-31")),
                },
                DisabilityHistoryInput {
                    disability_level: "4".to_owned(),
                    start_date: d("2023-06-01"),
                    end_date: None,
                },
            ]),
            ..input()
        };
        let errors = form.validate(None, d("2025-06-01")).unwrap_err();
        assert!(errors.get("disabilityHistories[0].disabilityLevel").is_some());
        assert!(errors.get("disabilityHistories[1]").is_some());
    }

    #[test]
    fn test_move_out_before_move_in() {
        let form = ResidentInput {
            move_out_date: Some(d("2024-03-31")),
            ..input()
        };
        let errors = form.validate(None, d("2025-06-01")).unwrap_err();
        assert!(errors.get("moveOutDate").is_some());
    }

    #[test]
    fn test_resided_on() {
        let r = resident(Some("2025-01-01"));
        assert!(r.resided_on(d("2025-01-01")));
        assert!(!r.resided_on(d("2025-01-02")));
        assert!(!r.resided_on(d("2020-03-31")));
    }
}
