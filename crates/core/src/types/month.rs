//! Calendar month used by shift preferences, usage grids and reports.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Error parsing a `YYYY-MM` month.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("対象月は YYYY-MM 形式で入力してください: {0}")]
pub struct MonthParseError(pub String);

/// A year and month, e.g. `2025-04`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, returning `None` for an out-of-range month number.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse `YYYY-MM`.
    ///
    /// # Errors
    ///
    /// Returns [`MonthParseError`] if the input is not a valid month.
    pub fn parse(s: &str) -> Result<Self, MonthParseError> {
        let err = || MonthParseError(s.to_owned());
        let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(err());
        }
        let year = y.parse::<i32>().map_err(|_| err())?;
        let month = m.parse::<u32>().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Number of days in the month.
    #[must_use]
    pub fn days(&self) -> u32 {
        self.last_day().day()
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether `date` falls in this month.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Every day of the month in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<YearMonth> for String {
    fn from(month: YearMonth) -> Self {
        month.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let m = YearMonth::parse("2025-04").unwrap();
        assert_eq!(m.year(), 2025);
        assert_eq!(m.month(), 4);
        assert_eq!(m.to_string(), "2025-04");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(YearMonth::parse("2025-13").is_err());
        assert!(YearMonth::parse("2025/04").is_err());
        assert!(YearMonth::parse("25-04").is_err());
        assert!(YearMonth::parse("2025-4").is_err());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(YearMonth::parse("2024-02").unwrap().days(), 29);
        assert_eq!(YearMonth::parse("2025-02").unwrap().days(), 28);
        assert_eq!(YearMonth::parse("2025-12").unwrap().days(), 31);
        assert_eq!(YearMonth::parse("2025-12").unwrap().iter_days().count(), 31);
    }

    #[test]
    fn test_december_rolls_over() {
        let dec = YearMonth::parse("2025-12").unwrap();
        assert_eq!(dec.next().to_string(), "2026-01");
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_contains() {
        let m = YearMonth::parse("2025-04").unwrap();
        assert!(m.contains(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap()));
        assert!(!m.contains(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));
        assert_eq!(YearMonth::of(NaiveDate::from_ymd_opt(2025, 4, 9).unwrap()), m);
    }
}
