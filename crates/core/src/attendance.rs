//! Worked-time calculation and monthly attendance totals.
//!
//! Group homes staff night shifts, so a clock-out at or before the clock-in
//! time is read as the next morning.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{UserId, YearMonth};

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("休憩時間が勤務時間（{shift_minutes}分）を超えています")]
    BreakExceedsShift { shift_minutes: i64 },
}

/// Minutes between clock-in and clock-out, wrapping past midnight.
#[must_use]
pub fn shift_minutes(clock_in: NaiveTime, clock_out: NaiveTime) -> i64 {
    let span = (clock_out - clock_in).num_minutes();
    if span <= 0 { span + MINUTES_PER_DAY } else { span }
}

/// Worked minutes for a completed shift.
///
/// # Errors
///
/// Returns [`AttendanceError::BreakExceedsShift`] if the break is longer
/// than the shift itself.
pub fn worked_minutes(
    clock_in: NaiveTime,
    clock_out: NaiveTime,
    break_minutes: u32,
) -> Result<i64, AttendanceError> {
    let shift = shift_minutes(clock_in, clock_out);
    let worked = shift - i64::from(break_minutes);
    if worked < 0 {
        return Err(AttendanceError::BreakExceedsShift {
            shift_minutes: shift,
        });
    }
    Ok(worked)
}

/// The fields of an attendance record needed for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftEntry {
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub clock_in: NaiveTime,
    pub clock_out: Option<NaiveTime>,
    pub break_minutes: u32,
}

/// One staff member's totals for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    pub user_id: UserId,
    pub month: YearMonth,
    /// Distinct dates with at least one completed shift.
    pub days_worked: u32,
    pub total_minutes: i64,
    /// `total_minutes` in hours, rounded to two decimals.
    pub total_hours: Decimal,
    /// Records still missing a clock-out.
    pub open_records: u32,
}

/// Convert minutes to hours with two decimal places.
#[must_use]
pub fn minutes_to_hours(minutes: i64) -> Decimal {
    (Decimal::from(minutes) / Decimal::from(60)).round_dp(2)
}

/// Aggregate shift entries into per-user monthly totals.
///
/// Entries outside `month` are ignored. Entries whose break exceeds the
/// shift contribute zero minutes. Users are returned in ID order.
#[must_use]
pub fn summarize_month(month: YearMonth, entries: &[ShiftEntry]) -> Vec<MonthlyAttendance> {
    #[derive(Default)]
    struct Acc {
        days: BTreeSet<NaiveDate>,
        minutes: i64,
        open: u32,
    }

    let mut by_user: BTreeMap<UserId, Acc> = BTreeMap::new();
    for entry in entries.iter().filter(|e| month.contains(e.work_date)) {
        let acc = by_user.entry(entry.user_id).or_default();
        match entry.clock_out {
            Some(out) => {
                acc.minutes += worked_minutes(entry.clock_in, out, entry.break_minutes).unwrap_or(0);
                acc.days.insert(entry.work_date);
            }
            None => acc.open += 1,
        }
    }

    by_user
        .into_iter()
        .map(|(user_id, acc)| MonthlyAttendance {
            user_id,
            month,
            days_worked: u32::try_from(acc.days.len()).unwrap_or(u32::MAX),
            total_minutes: acc.minutes,
            total_hours: minutes_to_hours(acc.minutes),
            open_records: acc.open,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_day_shift() {
        assert_eq!(worked_minutes(t("09:00"), t("18:00"), 60), Ok(480));
    }

    #[test]
    fn test_overnight_shift_wraps() {
        assert_eq!(shift_minutes(t("22:00"), t("07:00")), 540);
        assert_eq!(worked_minutes(t("17:00"), t("09:00"), 120), Ok(840));
        assert_eq!(shift_minutes(t("09:00"), t("09:00")), 1440);
    }

    #[test]
    fn test_break_longer_than_shift() {
        assert_eq!(
            worked_minutes(t("09:00"), t("10:00"), 90),
            Err(AttendanceError::BreakExceedsShift { shift_minutes: 60 })
        );
    }

    #[test]
    fn test_summarize_month() {
        let month = YearMonth::parse("2025-04").unwrap();
        let a = UserId::new(1);
        let b = UserId::new(2);
        let entries = [
            ShiftEntry {
                user_id: a,
                work_date: d("2025-04-01"),
                clock_in: t("09:00"),
                clock_out: Some(t("18:00")),
                break_minutes: 60,
            },
            ShiftEntry {
                user_id: a,
                work_date: d("2025-04-02"),
                clock_in: t("22:00"),
                clock_out: Some(t("07:00")),
                break_minutes: 60,
            },
            ShiftEntry {
                user_id: a,
                work_date: d("2025-04-03"),
                clock_in: t("09:00"),
                clock_out: None,
                break_minutes: 0,
            },
            ShiftEntry {
                user_id: b,
                work_date: d("2025-05-01"),
                clock_in: t("09:00"),
                clock_out: Some(t("17:00")),
                break_minutes: 0,
            },
        ];

        let report = summarize_month(month, &entries);
        assert_eq!(report.len(), 1);
        let row = &report[0];
        assert_eq!(row.user_id, a);
        assert_eq!(row.days_worked, 2);
        assert_eq!(row.total_minutes, 960);
        assert_eq!(row.total_hours, Decimal::from(16));
        assert_eq!(row.open_records, 1);
    }

    #[test]
    fn test_minutes_to_hours_rounds() {
        assert_eq!(minutes_to_hours(100).to_string(), "1.67");
    }
}
