//! Daily usage records (利用実績) and the monthly summary.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use grouphome_core::period;
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{DisabilityLevel, ResidentId, UsageRecordId, YearMonth};

use super::resident::{DisabilityHistory, Resident};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: UsageRecordId,
    pub resident_id: ResidentId,
    pub usage_date: NaiveDate,
    pub used: bool,
    /// Level in effect on `usage_date`; `None` when no history covers it.
    pub disability_level: Option<DisabilityLevel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub month: YearMonth,
    pub resident_id: Option<ResidentId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub month: YearMonth,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDayInput {
    pub date: NaiveDate,
    pub used: bool,
}

/// Bulk update of one resident's month.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMonthInput {
    pub resident_id: ResidentId,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub days: Vec<UsageDayInput>,
}

/// A validated day ready to upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUsageRecord {
    pub usage_date: NaiveDate,
    pub used: bool,
    pub disability_level: Option<DisabilityLevel>,
}

impl UsageMonthInput {
    /// Validate the days against the month and the resident's residency, and
    /// tag each with the level in effect.
    ///
    /// # Errors
    ///
    /// Returns field errors keyed `days[i].date`.
    pub fn validate(
        &self,
        resident: &Resident,
        histories: &[DisabilityHistory],
    ) -> Result<(YearMonth, Vec<NewUsageRecord>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Some(month) = errors.check("month", YearMonth::parse(&self.month)) else {
            return Err(errors);
        };

        let mut seen = BTreeSet::new();
        for (i, day) in self.days.iter().enumerate() {
            let field = format!("days[{i}].date");
            if !month.contains(day.date) {
                errors.add(field, format_args!("{}は{month}の日付ではありません", day.date));
            } else if !seen.insert(day.date) {
                errors.add(field, format_args!("{}が重複しています", day.date));
            } else if !resident.resided_on(day.date) {
                errors.add(field, format_args!("{}は入居期間外です", day.date));
            }
        }

        errors.into_result()?;
        let records = self
            .days
            .iter()
            .map(|day| NewUsageRecord {
                usage_date: day.date,
                used: day.used,
                disability_level: period::entry_on(histories, day.date).map(|h| h.level),
            })
            .collect();
        Ok((month, records))
    }
}

/// One resident's totals for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentUsage {
    pub resident_id: ResidentId,
    pub resident_name: String,
    pub used_days: u32,
    /// Used days grouped by the level in effect on each day.
    pub by_level: BTreeMap<DisabilityLevel, u32>,
    /// Used days with no covering disability history.
    pub unresolved_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub month: YearMonth,
    pub residents: Vec<ResidentUsage>,
    pub total_used_days: u32,
}

/// Summarize used days per resident for a month.
///
/// Residents with no used day are omitted. `names` maps resident IDs to
/// display names; unknown IDs get an empty name.
#[must_use]
pub fn summarize_usage(
    month: YearMonth,
    records: &[UsageRecord],
    names: &BTreeMap<ResidentId, String>,
) -> UsageSummary {
    let mut by_resident: BTreeMap<ResidentId, ResidentUsage> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.used && month.contains(r.usage_date))
    {
        let usage = by_resident
            .entry(record.resident_id)
            .or_insert_with(|| ResidentUsage {
                resident_id: record.resident_id,
                resident_name: names.get(&record.resident_id).cloned().unwrap_or_default(),
                used_days: 0,
                by_level: BTreeMap::new(),
                unresolved_days: 0,
            });
        usage.used_days += 1;
        match record.disability_level {
            Some(level) => *usage.by_level.entry(level).or_default() += 1,
            None => usage.unresolved_days += 1,
        }
    }

    let residents: Vec<_> = by_resident.into_values().collect();
    UsageSummary {
        month,
        total_used_days: residents.iter().map(|r| r.used_days).sum(),
        residents,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use grouphome_core::period::Period;
    use grouphome_core::{DisabilityHistoryId, RecordStatus};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn resident() -> Resident {
        Resident {
            id: ResidentId::new(1),
            name: "田中 太郎".to_owned(),
            name_kana: None,
            group_home_id: None,
            unit_name: None,
            room_number: None,
            move_in_date: Some(d("2025-04-10")),
            move_out_date: None,
            status: RecordStatus::Active,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn histories() -> Vec<DisabilityHistory> {
        vec![
            DisabilityHistory {
                id: DisabilityHistoryId::new(1),
                resident_id: ResidentId::new(1),
                level: DisabilityLevel::Three,
                period: Period::new(d("2025-04-10"), Some(d("2025-04-19"))).unwrap(),
            },
            DisabilityHistory {
                id: DisabilityHistoryId::new(2),
                resident_id: ResidentId::new(1),
                level: DisabilityLevel::Four,
                period: Period::open(d("2025-04-21")),
            },
        ]
    }

    fn day(date: &str, used: bool) -> UsageDayInput {
        UsageDayInput { date: d(date), used }
    }

    #[test]
    fn test_levels_resolved_per_date() {
        let input = UsageMonthInput {
            resident_id: ResidentId::new(1),
            month: "2025-04".to_owned(),
            days: vec![day("2025-04-19", true), day("2025-04-20", true), day("2025-04-21", false)],
        };
        let (month, records) = input.validate(&resident(), &histories()).unwrap();
        assert_eq!(month.to_string(), "2025-04");
        let levels: Vec<_> = records.iter().map(|r| r.disability_level).collect();
        assert_eq!(
            levels,
            vec![Some(DisabilityLevel::Three), None, Some(DisabilityLevel::Four)]
        );
    }

    #[test]
    fn test_rejects_out_of_month_duplicate_and_pre_move_in() {
        let input = UsageMonthInput {
            resident_id: ResidentId::new(1),
            month: "2025-04".to_owned(),
            days: vec![
                day("2025-05-01", true),
                day("2025-04-12", true),
                day("2025-04-12", false),
                day("2025-04-09", true),
            ],
        };
        let errors = input.validate(&resident(), &histories()).unwrap_err();
        assert!(errors.get("days[0].date").is_some());
        assert!(errors.get("days[1].date").is_none());
        assert!(errors.get("days[2].date").is_some());
        assert!(errors.get("days[3].date").is_some());
    }

    #[test]
    fn test_summary_groups_by_level() {
        let month = YearMonth::parse("2025-04").unwrap();
        let rid = ResidentId::new(1);
        let record = |id, date: &str, used, level| UsageRecord {
            id: UsageRecordId::new(id),
            resident_id: rid,
            usage_date: d(date),
            used,
            disability_level: level,
        };
        let records = [
            record(1, "2025-04-19", true, Some(DisabilityLevel::Three)),
            record(2, "2025-04-20", true, None),
            record(3, "2025-04-21", true, Some(DisabilityLevel::Four)),
            record(4, "2025-04-22", true, Some(DisabilityLevel::Four)),
            record(5, "2025-04-23", false, Some(DisabilityLevel::Four)),
        ];
        let names = BTreeMap::from([(rid, "田中 太郎".to_owned())]);

        let summary = summarize_usage(month, &records, &names);
        assert_eq!(summary.total_used_days, 4);
        let row = &summary.residents[0];
        assert_eq!(row.resident_name, "田中 太郎");
        assert_eq!(row.by_level.get(&DisabilityLevel::Four), Some(&2));
        assert_eq!(row.unresolved_days, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["residents"][0]["byLevel"]["3"], 1);
    }
}
