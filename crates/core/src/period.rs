//! Effective-dated periods and the history overlap validator.
//!
//! Department histories (staff) and disability histories (residents) are
//! both lists of periods owned by one record. Within one owner:
//!
//! - no two periods may overlap (end dates are inclusive), and
//! - at most one period may be open-ended.
//!
//! A second open period can only be accepted when the previously open one is
//! closed in the same edit, which is why [`check_history`] validates the
//! whole proposed list rather than a single entry.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationErrors;

/// A period was constructed with an end before its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("終了日は開始日以降の日付を入力してください")]
pub struct PeriodError;

/// A date range with an inclusive end, or open-ended when `end` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPeriod")]
pub struct Period {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    start_date: NaiveDate,
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = PeriodError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Self::new(raw.start_date, raw.end_date)
    }
}

impl Period {
    /// Create a period.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError`] if `end` is before `start`.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, PeriodError> {
        if end.is_some_and(|end| end < start) {
            return Err(PeriodError);
        }
        Ok(Self {
            start_date: start,
            end_date: end,
        })
    }

    /// An open-ended period starting on `start`.
    #[must_use]
    pub const fn open(start: NaiveDate) -> Self {
        Self {
            start_date: start,
            end_date: None,
        }
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub const fn end(&self) -> Option<NaiveDate> {
        self.end_date
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether `date` is inside the period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }

    /// Whether two periods share at least one day.
    ///
    /// Two open periods always conflict. An open period conflicts with a
    /// closed one when it starts on or before the closed one's end.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self.end_date, other.end_date) {
            (None, None) => true,
            (None, Some(other_end)) => self.start_date <= other_end,
            (Some(end), None) => other.start_date <= end,
            (Some(end), Some(other_end)) => {
                self.start_date <= other_end && end >= other.start_date
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end_date {
            Some(end) => write!(f, "{}〜{}", self.start_date, end),
            None => write!(f, "{}〜", self.start_date),
        }
    }
}

/// Anything that carries an effective period.
pub trait Dated {
    fn period(&self) -> Period;
}

impl Dated for Period {
    fn period(&self) -> Period {
        *self
    }
}

/// Why a history entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryConflict {
    #[error("期間が既存の履歴（{existing}）と重複しています")]
    Overlap { existing: Period },
    #[error("終了日が未設定の履歴は1件までです。先に現在の履歴の終了日を入力してください")]
    MultipleOpen,
}

/// A conflict located at a position in a proposed history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{index}件目: {conflict}")]
pub struct HistorySetError {
    /// Zero-based position of the rejected entry.
    pub index: usize,
    pub conflict: HistoryConflict,
}

fn conflict_between(candidate: &Period, existing: &Period) -> Option<HistoryConflict> {
    if candidate.is_open() && existing.is_open() {
        return Some(HistoryConflict::MultipleOpen);
    }
    candidate.overlaps(existing).then_some(HistoryConflict::Overlap {
        existing: *existing,
    })
}

/// Check a single new or edited entry against the owner's other entries.
///
/// `editing` is the key of the entry being edited; the stored version of that
/// entry is skipped so it does not conflict with itself.
///
/// # Errors
///
/// Returns the first [`HistoryConflict`] found.
pub fn check_candidate<K, I>(
    candidate: &Period,
    editing: Option<K>,
    existing: I,
) -> Result<(), HistoryConflict>
where
    K: PartialEq,
    I: IntoIterator<Item = (K, Period)>,
{
    let others: Vec<Period> = existing
        .into_iter()
        .filter(|(key, _)| editing.as_ref() != Some(key))
        .map(|(_, period)| period)
        .collect();

    // Report the single-open-entry rule ahead of plain overlaps.
    if candidate.is_open() && others.iter().any(Period::is_open) {
        return Err(HistoryConflict::MultipleOpen);
    }

    others
        .iter()
        .find_map(|other| conflict_between(candidate, other))
        .map_or(Ok(()), Err)
}

/// Validate a complete proposed history list.
///
/// Every pair is compared; a conflict is reported on the later entry, so the
/// entry being added is the one flagged when appended to an existing list.
///
/// # Errors
///
/// Returns the first [`HistorySetError`] in list order.
pub fn check_history<T: Dated>(entries: &[T]) -> Result<(), HistorySetError> {
    let periods: Vec<Period> = entries.iter().map(Dated::period).collect();
    for (index, candidate) in periods.iter().enumerate() {
        for earlier in periods.iter().take(index) {
            if let Some(conflict) = conflict_between(candidate, earlier) {
                return Err(HistorySetError { index, conflict });
            }
        }
    }
    Ok(())
}

/// The entry whose period contains `date`.
///
/// Accepted histories never overlap, so at most one entry matches; if stored
/// data does overlap, the latest-starting entry wins.
pub fn entry_on<T: Dated>(entries: &[T], date: NaiveDate) -> Option<&T> {
    entries
        .iter()
        .filter(|e| e.period().contains(date))
        .max_by_key(|e| e.period().start())
}

/// Turn submitted `(start, end)` rows into a validated history list.
///
/// Rows with an end before their start are reported as
/// `{field}[i].endDate`; a set-level conflict is reported as `{field}[i]`
/// on the later entry. Returns `None` when anything was recorded.
pub fn validate_history_input(
    errors: &mut ValidationErrors,
    field: &str,
    rows: &[(NaiveDate, Option<NaiveDate>)],
) -> Option<Vec<Period>> {
    let mut periods = Vec::with_capacity(rows.len());
    let mut valid = true;
    for (i, (start, end)) in rows.iter().enumerate() {
        match Period::new(*start, *end) {
            Ok(period) => periods.push(period),
            Err(e) => {
                errors.add(format!("{field}[{i}].endDate"), e);
                valid = false;
            }
        }
    }
    if !valid {
        return None;
    }
    if let Err(e) = check_history(&periods) {
        errors.add(format!("{field}[{}]", e.index), e.conflict);
        return None;
    }
    Some(periods)
}

/// Sort entries by start date, oldest first.
pub fn sort_by_start<T: Dated>(entries: &mut [T]) {
    entries.sort_by_key(|e| e.period().start());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn closed(start: &str, end: &str) -> Period {
        Period::new(d(start), Some(d(end))).unwrap()
    }

    fn open(start: &str) -> Period {
        Period::open(d(start))
    }

    #[test]
    fn test_end_before_start_rejected() {
        assert_eq!(Period::new(d("2024-02-01"), Some(d("2024-01-31"))), Err(PeriodError));
        assert!(Period::new(d("2024-02-01"), Some(d("2024-02-01"))).is_ok());
    }

    #[test]
    fn test_overlap_truth_table() {
        // (a, b, expected)
        let cases = [
            // both closed
            (closed("2024-01-01", "2024-03-31"), closed("2024-04-01", "2024-06-30"), false),
            (closed("2024-01-01", "2024-04-01"), closed("2024-04-01", "2024-06-30"), true),
            (closed("2024-01-01", "2024-12-31"), closed("2024-04-01", "2024-06-30"), true),
            (closed("2024-07-01", "2024-12-31"), closed("2024-04-01", "2024-06-30"), false),
            // one open
            (open("2024-07-01"), closed("2024-04-01", "2024-06-30"), false),
            (open("2024-06-30"), closed("2024-04-01", "2024-06-30"), true),
            (open("2024-01-01"), closed("2024-04-01", "2024-06-30"), true),
            (closed("2024-04-01", "2024-06-30"), open("2024-07-01"), false),
            (closed("2024-04-01", "2024-07-01"), open("2024-07-01"), true),
            // both open
            (open("2020-01-01"), open("2030-01-01"), true),
        ];

        for (a, b, expected) in cases {
            assert_eq!(a.overlaps(&b), expected, "{a} vs {b}");
            assert_eq!(b.overlaps(&a), expected, "{b} vs {a}");
        }
    }

    #[test]
    fn test_second_open_entry_rejected() {
        let existing = [(1, open("2023-01-01"))];
        let result = check_candidate(&open("2024-01-01"), None, existing);
        assert_eq!(result, Err(HistoryConflict::MultipleOpen));
    }

    #[test]
    fn test_editing_entry_skips_itself() {
        let existing = [(1, closed("2023-01-01", "2023-12-31")), (2, open("2024-01-01"))];
        assert!(check_candidate(&open("2024-02-01"), Some(2), existing).is_ok());
        assert_eq!(
            check_candidate(&open("2023-06-01"), Some(2), existing),
            Err(HistoryConflict::Overlap {
                existing: closed("2023-01-01", "2023-12-31")
            })
        );
    }

    #[test]
    fn test_closed_candidate_before_open_entry_accepted() {
        let existing = [(1, open("2023-01-01"))];
        assert!(check_candidate(&closed("2022-01-01", "2022-12-31"), None, existing).is_ok());
        assert!(check_candidate(&closed("2022-06-01", "2023-01-01"), None, existing).is_err());
    }

    #[test]
    fn test_history_set_flags_new_entry() {
        let entries = [open("2023-01-01"), open("2024-01-01")];
        assert_eq!(
            check_history(&entries),
            Err(HistorySetError {
                index: 1,
                conflict: HistoryConflict::MultipleOpen
            })
        );
    }

    #[test]
    fn test_history_set_accepts_closing_previous_in_same_edit() {
        let entries = [closed("2023-01-01", "2023-12-31"), open("2024-01-01")];
        assert!(check_history(&entries).is_ok());
    }

    #[test]
    fn test_history_set_overlap() {
        let entries = [
            closed("2022-01-01", "2022-12-31"),
            closed("2023-01-01", "2023-06-30"),
            closed("2022-12-01", "2022-12-15"),
        ];
        let err = check_history(&entries).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(err.conflict, HistoryConflict::Overlap { .. }));
    }

    #[test]
    fn test_accepted_sets_have_at_most_one_open_entry() {
        let candidates = [
            vec![open("2023-01-01")],
            vec![closed("2021-01-01", "2022-12-31"), open("2023-01-01")],
            vec![open("2021-01-01"), closed("2019-01-01", "2020-12-31")],
            vec![open("2021-01-01"), open("2025-01-01")],
            vec![closed("2021-01-01", "2021-12-31"), closed("2022-01-01", "2022-12-31")],
        ];
        for entries in candidates {
            if check_history(&entries).is_ok() {
                assert!(entries.iter().filter(|p| p.is_open()).count() <= 1);
            }
        }
    }

    #[test]
    fn test_entry_on_date() {
        let entries = [closed("2023-01-01", "2023-12-31"), open("2024-01-01")];
        assert_eq!(entry_on(&entries, d("2023-12-31")), Some(&entries[0]));
        assert_eq!(entry_on(&entries, d("2024-01-01")), Some(&entries[1]));
        assert_eq!(entry_on(&entries, d("2022-12-31")), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(open("2024-01-01").to_string(), "2024-01-01〜");
        assert_eq!(closed("2024-01-01", "2024-03-31").to_string(), "2024-01-01〜2024-03-31");
    }

    #[test]
    fn test_deserialize_validates_order() {
        let ok: Result<Period, _> =
            serde_json::from_str(r#"{"startDate":"2024-01-01","endDate":null}"#);
        assert_eq!(ok.unwrap(), open("2024-01-01"));
        let bad: Result<Period, _> =
            serde_json::from_str(r#"{"startDate":"2024-02-01","endDate":"2024-01-01"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_history_input_errors_are_field_scoped() {
        let mut errors = ValidationErrors::new();
        let rows = [(d("2024-02-01"), Some(d("2024-01-01")))];
        assert!(validate_history_input(&mut errors, "disabilityHistories", &rows).is_none());
        assert!(errors.get("disabilityHistories[0].endDate").is_some());

        let mut errors = ValidationErrors::new();
        let rows = [(d("2023-01-01"), None), (d("2024-01-01"), None)];
        assert!(validate_history_input(&mut errors, "disabilityHistories", &rows).is_none());
        assert_eq!(
            errors.get("disabilityHistories[1]"),
            Some(HistoryConflict::MultipleOpen.to_string().as_str())
        );

        let mut errors = ValidationErrors::new();
        let rows = [(d("2023-01-01"), Some(d("2023-12-31"))), (d("2024-01-01"), None)];
        let periods = validate_history_input(&mut errors, "departmentHistories", &rows).unwrap();
        assert_eq!(periods.len(), 2);
        assert!(errors.is_empty());
    }
}
