//! Attendance API handlers and the monthly report.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use grouphome_core::attendance::{MonthlyAttendance, minutes_to_hours, summarize_month};
use grouphome_core::validation::ValidationErrors;
use grouphome_core::{AttendanceRecordId, Permission, UserId, YearMonth};

use crate::{
    db::{AttendanceRepository, UserRepository},
    error::AppError,
    models::{
        CurrentStaff,
        attendance::{AttendanceFilter, AttendanceInput, AttendanceRecord, AttendanceView, ReportQuery},
        user::UserFilter,
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};

const OWN: Permission = Permission::AttendanceRecord;
const OTHERS: Permission = Permission::AttendanceViewAll;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/attendance", get(index).post(create))
        .route("/api/attendance/report", get(report))
        .route("/api/attendance/{id}", put(update).delete(destroy))
}

/// One staff member's row in the monthly report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub user_name: String,
    #[serde(flatten)]
    pub totals: MonthlyAttendance,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub month: YearMonth,
    pub rows: Vec<ReportRow>,
    pub total_minutes: i64,
    pub total_hours: Decimal,
}

async fn load(state: &AppState, id: AttendanceRecordId) -> Result<AttendanceRecord, AppError> {
    AttendanceRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("勤怠".to_owned()))
}

fn target_user(staff: &CurrentStaff, requested: Option<UserId>) -> Result<UserId, AppError> {
    requested.or(staff.staff.user_id).ok_or_else(|| {
        ValidationErrors::from(("userId", "職員を選択してください".to_owned())).into()
    })
}

/// List records.
///
/// Without `attendance.view_all` the list is limited to the logged-in staff
/// member.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(mut filter): ApiQuery<AttendanceFilter>,
) -> Result<Json<Vec<AttendanceView>>, AppError> {
    match filter.user_id {
        Some(user_id) => staff.require_for(user_id, OWN, OTHERS)?,
        None if staff.can(OTHERS) => {}
        None => {
            staff.require(OWN)?;
            filter.user_id = Some(
                staff
                    .staff
                    .user_id
                    .ok_or(AppError::Forbidden(OTHERS.as_str().to_owned()))?,
            );
        }
    }

    let records = AttendanceRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(records.into_iter().map(AttendanceView::from).collect()))
}

/// Record a shift.
///
/// # Errors
///
/// Returns 400 for malformed times or a break longer than the shift.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<AttendanceInput>,
) -> Result<(StatusCode, Json<AttendanceView>), AppError> {
    let user_id = target_user(&staff, input.user_id)?;
    staff.require_for(user_id, OWN, OTHERS)?;
    let new_record = input.validate(user_id)?;

    let record = AttendanceRepository::new(state.pool())
        .create(&new_record)
        .await?;
    tracing::info!(user_id = %user_id, work_date = %record.work_date, "Recorded attendance");
    Ok((StatusCode::CREATED, Json(AttendanceView::from(record))))
}

#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AttendanceRecordId>,
    LenientJson(input): LenientJson<AttendanceInput>,
) -> Result<Json<AttendanceView>, AppError> {
    let current = load(&state, id).await?;
    staff.require_for(current.user_id, OWN, OTHERS)?;
    let user_id = input.user_id.unwrap_or(current.user_id);
    staff.require_for(user_id, OWN, OTHERS)?;
    let new_record = input.validate(user_id)?;

    let record = AttendanceRepository::new(state.pool())
        .update(id, &new_record)
        .await?;
    Ok(Json(AttendanceView::from(record)))
}

#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AttendanceRecordId>,
) -> Result<StatusCode, AppError> {
    let current = load(&state, id).await?;
    staff.require_for(current.user_id, OWN, OTHERS)?;
    AttendanceRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Worked days and hours per staff member for a month.
///
/// # Errors
///
/// Returns 403 without `attendance.report`.
#[instrument(skip(staff, state))]
pub async fn report(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<AttendanceReport>, AppError> {
    staff.require(Permission::AttendanceReport)?;
    let filter = AttendanceFilter {
        month: Some(query.month),
        user_id: None,
    };
    let records = AttendanceRepository::new(state.pool()).list(&filter).await?;
    let entries: Vec<_> = records.iter().map(AttendanceRecord::as_shift).collect();

    let names: BTreeMap<UserId, String> = UserRepository::new(state.pool())
        .list(&UserFilter::default(), state.today())
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let rows: Vec<ReportRow> = summarize_month(query.month, &entries)
        .into_iter()
        .map(|totals| ReportRow {
            user_name: names.get(&totals.user_id).cloned().unwrap_or_default(),
            totals,
        })
        .collect();
    let total_minutes = rows.iter().map(|r| r.totals.total_minutes).sum();

    Ok(Json(AttendanceReport {
        month: query.month,
        rows,
        total_minutes,
        total_hours: minutes_to_hours(total_minutes),
    }))
}
