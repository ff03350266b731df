//! Staff (user) domain types and department history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::period::{self, Dated, Period};
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{
    DepartmentHistoryId, DepartmentId, Email, RecordStatus, StatusCheck, UserId, derive_status,
};

/// A staff member (domain type).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role_name: String,
    pub hire_date: Option<NaiveDate>,
    pub retirement_date: Option<NaiveDate>,
    /// Status as last written. Compared against the derived status on read.
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One period in a department.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentHistory {
    pub id: DepartmentHistoryId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub department_name: String,
    pub period: Period,
}

impl Dated for DepartmentHistory {
    fn period(&self) -> Period {
        self.period
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentHistoryView {
    pub id: DepartmentHistoryId,
    pub department_id: DepartmentId,
    pub department_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<&DepartmentHistory> for DepartmentHistoryView {
    fn from(h: &DepartmentHistory) -> Self {
        Self {
            id: h.id,
            department_id: h.department_id,
            department_name: h.department_name.clone(),
            start_date: h.period.start(),
            end_date: h.period.end(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDepartment {
    pub id: DepartmentId,
    pub name: String,
}

/// Staff member as returned by the API.
///
/// `status` is always derived from the retirement date; `statusMismatch`
/// flags a stored status that disagrees with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role_name: String,
    pub hire_date: Option<NaiveDate>,
    pub retirement_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub stored_status: RecordStatus,
    pub status_mismatch: bool,
    pub current_department: Option<CurrentDepartment>,
    pub department_histories: Vec<DepartmentHistoryView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserView {
    #[must_use]
    pub fn new(user: User, histories: &[DepartmentHistory], today: NaiveDate) -> Self {
        let check = StatusCheck::new(user.retirement_date, Some(user.status), today);
        let current_department = period::entry_on(histories, today).map(|h| CurrentDepartment {
            id: h.department_id,
            name: h.department_name.clone(),
        });
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role_name: user.role_name,
            hire_date: user.hire_date,
            retirement_date: user.retirement_date,
            status: check.status,
            stored_status: user.status,
            status_mismatch: check.is_mismatch(),
            current_department,
            department_histories: histories.iter().map(Into::into).collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentHistoryInput {
    pub department_id: DepartmentId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A validated department period ready to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDepartmentHistory {
    pub department_id: DepartmentId,
    pub period: Period,
}

/// Validate a proposed department history list as a whole.
///
/// # Errors
///
/// Returns field errors keyed `departmentHistories[i]` for invalid or
/// conflicting entries.
pub fn validate_department_histories(
    rows: &[DepartmentHistoryInput],
) -> Result<Vec<NewDepartmentHistory>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let periods = check_department_histories(&mut errors, rows);
    errors.into_result()?;
    Ok(periods.unwrap_or_default())
}

fn check_department_histories(
    errors: &mut ValidationErrors,
    rows: &[DepartmentHistoryInput],
) -> Option<Vec<NewDepartmentHistory>> {
    let raw: Vec<_> = rows.iter().map(|r| (r.start_date, r.end_date)).collect();
    let periods = period::validate_history_input(errors, "departmentHistories", &raw)?;
    Some(
        rows.iter()
            .zip(periods)
            .map(|(row, period)| NewDepartmentHistory {
                department_id: row.department_id,
                period,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub retirement_date: Option<NaiveDate>,
    /// When present, replaces the whole department history.
    #[serde(default)]
    pub department_histories: Option<Vec<DepartmentHistoryInput>>,
}

/// A validated staff record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub role_name: String,
    pub hire_date: Option<NaiveDate>,
    pub retirement_date: Option<NaiveDate>,
    /// Status derived at save time.
    pub status: RecordStatus,
    pub department_histories: Option<Vec<NewDepartmentHistory>>,
}

impl UserInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self, today: NaiveDate) -> Result<NewUser, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require("name", "氏名", &self.name);
        errors.max_chars("name", "氏名", self.name.trim(), 100);
        let email = errors.check("email", Email::parse(&self.email));
        errors.require("roleName", "ロール", &self.role_name);

        if let (Some(hire), Some(retire)) = (self.hire_date, self.retirement_date)
            && retire < hire
        {
            errors.add("retirementDate", "退職日は入社日以降の日付を入力してください");
        }

        let histories = self
            .department_histories
            .as_deref()
            .map(|rows| check_department_histories(&mut errors, rows));

        errors.into_result()?;
        let email = email.ok_or_else(|| ValidationErrors::from(("email", String::new())))?;

        Ok(NewUser {
            name: self.name.trim().to_owned(),
            email,
            role_name: self.role_name.trim().to_owned(),
            hire_date: self.hire_date,
            retirement_date: self.retirement_date,
            status: derive_status(self.retirement_date, today),
            department_histories: histories.map(Option::unwrap_or_default),
        })
    }
}

/// List filters for `GET /api/users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Substring of name or email.
    pub q: Option<String>,
    pub status: Option<RecordStatus>,
    pub department_id: Option<DepartmentId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn input() -> UserInput {
        UserInput {
            name: "佐藤 一郎".to_owned(),
            email: "ichiro@example.jp".to_owned(),
            role_name: "staff".to_owned(),
            hire_date: Some(d("2022-04-01")),
            retirement_date: None,
            department_histories: None,
        }
    }

    fn user(retirement: Option<&str>, stored: RecordStatus) -> User {
        User {
            id: UserId::new(1),
            name: "佐藤 一郎".to_owned(),
            email: Email::parse("ichiro@example.jp").unwrap(),
            role_name: "staff".to_owned(),
            hire_date: Some(d("2022-04-01")),
            retirement_date: retirement.map(d),
            status: stored,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_user_status_derived() {
        let mut form = input();
        form.retirement_date = Some(d("2025-03-31"));
        let user = form.validate(d("2025-06-01")).unwrap();
        assert_eq!(user.status, RecordStatus::Inactive);
        assert!(user.department_histories.is_none());
    }

    #[test]
    fn test_invalid_fields_collected() {
        let form = UserInput {
            name: String::new(),
            email: "not-an-email".to_owned(),
            retirement_date: Some(d("2021-01-01")),
            ..input()
        };
        let errors = form.validate(d("2025-06-01")).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("retirementDate").is_some());
    }

    #[test]
    fn test_second_open_department_rejected() {
        let form = UserInput {
            department_histories: Some(vec![
                DepartmentHistoryInput {
                    department_id: DepartmentId::new(1),
                    start_date: d("2022-04-01"),
                    end_date: None,
                },
                DepartmentHistoryInput {
                    department_id: DepartmentId::new(2),
                    start_date: d("2024-04-01"),
                    end_date: None,
                },
            ]),
            ..input()
        };
        let errors = form.validate(d("2025-06-01")).unwrap_err();
        assert!(errors.get("departmentHistories[1]").is_some());
    }

    #[test]
    fn test_closing_previous_entry_in_same_edit_accepted() {
        let rows = [
            DepartmentHistoryInput {
                department_id: DepartmentId::new(1),
                start_date: d("2022-04-01"),
                end_date: Some(d("2024-03-31")),
            },
            DepartmentHistoryInput {
                department_id: DepartmentId::new(2),
                start_date: d("2024-04-01"),
                end_date: None,
            },
        ];
        assert_eq!(validate_department_histories(&rows).unwrap().len(), 2);
    }

    #[test]
    fn test_view_reports_mismatch_and_current_department() {
        let histories = [DepartmentHistory {
            id: DepartmentHistoryId::new(1),
            user_id: UserId::new(1),
            department_id: DepartmentId::new(3),
            department_name: "世話人".to_owned(),
            period: Period::open(d("2022-04-01")),
        }];
        let view = UserView::new(
            user(Some("2025-01-01"), RecordStatus::Active),
            &histories,
            d("2025-06-01"),
        );
        assert_eq!(view.status, RecordStatus::Inactive);
        assert!(view.status_mismatch);
        assert_eq!(view.current_department.unwrap().name, "世話人");

        let json = serde_json::to_value(UserView::new(
            user(None, RecordStatus::Active),
            &[],
            d("2025-06-01"),
        ))
        .unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["statusMismatch"], false);
        assert!(json["departmentHistories"].as_array().unwrap().is_empty());
    }
}
