//! Attendance records (勤怠).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use grouphome_core::attendance::{ShiftEntry, worked_minutes};
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{AttendanceRecordId, GroupHomeId, UserId, YearMonth};

use super::non_blank;

/// Longest break accepted on one shift.
const MAX_BREAK_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub id: AttendanceRecordId,
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub group_home_id: Option<GroupHomeId>,
    pub clock_in: NaiveTime,
    pub clock_out: Option<NaiveTime>,
    pub break_minutes: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    #[must_use]
    pub const fn as_shift(&self) -> ShiftEntry {
        ShiftEntry {
            user_id: self.user_id,
            work_date: self.work_date,
            clock_in: self.clock_in,
            clock_out: self.clock_out,
            break_minutes: self.break_minutes,
        }
    }
}

fn serialize_hm<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format("%H:%M"))
}

fn serialize_opt_hm<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
    match time {
        Some(t) => serialize_hm(t, s),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: AttendanceRecordId,
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub group_home_id: Option<GroupHomeId>,
    #[serde(serialize_with = "serialize_hm")]
    pub clock_in: NaiveTime,
    #[serde(serialize_with = "serialize_opt_hm")]
    pub clock_out: Option<NaiveTime>,
    pub break_minutes: u32,
    /// `None` until clocked out.
    pub worked_minutes: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AttendanceRecord> for AttendanceView {
    fn from(r: AttendanceRecord) -> Self {
        let worked = r
            .clock_out
            .and_then(|out| worked_minutes(r.clock_in, out, r.break_minutes).ok());
        Self {
            id: r.id,
            user_id: r.user_id,
            work_date: r.work_date,
            group_home_id: r.group_home_id,
            clock_in: r.clock_in,
            clock_out: r.clock_out,
            break_minutes: r.break_minutes,
            worked_minutes: worked,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
fn parse_clock(raw: &str) -> Result<NaiveTime, &'static str> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| "時刻は HH:MM 形式で入力してください")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    /// Defaults to the logged-in staff member.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub work_date: Option<NaiveDate>,
    #[serde(default)]
    pub group_home_id: Option<GroupHomeId>,
    #[serde(default)]
    pub clock_in: String,
    #[serde(default)]
    pub clock_out: Option<String>,
    #[serde(default)]
    pub break_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub user_id: UserId,
    pub work_date: NaiveDate,
    pub group_home_id: Option<GroupHomeId>,
    pub clock_in: NaiveTime,
    pub clock_out: Option<NaiveTime>,
    pub break_minutes: u32,
    pub notes: Option<String>,
}

impl AttendanceInput {
    /// Validate for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self, user_id: UserId) -> Result<NewAttendance, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.work_date.is_none() {
            errors.add("workDate", "勤務日を入力してください");
        }
        errors.require("clockIn", "出勤時刻", &self.clock_in);
        let clock_in = errors.check("clockIn", parse_clock(&self.clock_in));
        let clock_out = match non_blank(self.clock_out.as_deref()) {
            Some(raw) => errors.check("clockOut", parse_clock(&raw)).map(Some),
            None => Some(None),
        };
        if self.break_minutes > MAX_BREAK_MINUTES {
            errors.add("breakMinutes", "休憩時間が長すぎます");
        }
        if let (Some(start), Some(Some(end))) = (clock_in, clock_out) {
            errors.check("breakMinutes", worked_minutes(start, end, self.break_minutes));
        }
        if let Some(notes) = &self.notes {
            errors.max_chars("notes", "備考", notes, 1000);
        }

        errors.into_result()?;
        match (self.work_date, clock_in, clock_out) {
            (Some(work_date), Some(clock_in), Some(clock_out)) => Ok(NewAttendance {
                user_id,
                work_date,
                group_home_id: self.group_home_id,
                clock_in,
                clock_out,
                break_minutes: self.break_minutes,
                notes: non_blank(self.notes.as_deref()),
            }),
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub month: Option<YearMonth>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub month: YearMonth,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(clock_in: &str, clock_out: Option<&str>, break_minutes: u32) -> AttendanceInput {
        AttendanceInput {
            user_id: None,
            work_date: Some("2025-04-01".parse().unwrap()),
            group_home_id: Some(GroupHomeId::new(1)),
            clock_in: clock_in.to_owned(),
            clock_out: clock_out.map(ToOwned::to_owned),
            break_minutes,
            notes: None,
        }
    }

    #[test]
    fn test_overnight_shift_accepted() {
        let rec = input("17:00", Some("09:00"), 120).validate(UserId::new(1)).unwrap();
        assert_eq!(rec.clock_out, NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn test_open_shift_accepted() {
        let rec = input("09:00:00", Some(""), 0).validate(UserId::new(1)).unwrap();
        assert_eq!(rec.clock_out, None);
    }

    #[test]
    fn test_break_longer_than_shift() {
        let errors = input("09:00", Some("10:00"), 90)
            .validate(UserId::new(1))
            .unwrap_err();
        assert!(errors.get("breakMinutes").is_some());
    }

    #[test]
    fn test_bad_times() {
        let errors = input("9時", Some("25:00"), 0).validate(UserId::new(1)).unwrap_err();
        assert!(errors.get("clockIn").is_some());
        assert!(errors.get("clockOut").is_some());
    }

    #[test]
    fn test_view_formats_times() {
        let record = AttendanceRecord {
            id: AttendanceRecordId::new(1),
            user_id: UserId::new(1),
            work_date: "2025-04-01".parse().unwrap(),
            group_home_id: None,
            clock_in: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            clock_out: NaiveTime::from_hms_opt(7, 0, 0),
            break_minutes: 60,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(AttendanceView::from(record)).unwrap();
        assert_eq!(json["clockIn"], "22:00");
        assert_eq!(json["clockOut"], "07:00");
        assert_eq!(json["workedMinutes"], 480);
    }
}
