//! Usage record API handlers.
//!
//! Records are edited a resident-month at a time. Each saved day carries the
//! disability level in effect on that day, so later history edits do not
//! rewrite past months.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use grouphome_core::{Permission, ResidentId};

use crate::{
    db::{ResidentRepository, UsageRecordRepository},
    error::AppError,
    models::{
        CurrentStaff,
        resident::ResidentFilter,
        usage_record::{
            SummaryQuery, UsageMonthInput, UsageQuery, UsageRecord, UsageSummary,
            summarize_usage,
        },
    },
    state::AppState,
};

use super::extract::{ApiQuery, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/usage_records", get(index).put(save_month))
        .route("/api/usage_records/summary", get(summary))
}

/// Records of a month, optionally for one resident.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UsageQuery>,
) -> Result<Json<Vec<UsageRecord>>, AppError> {
    staff.require(Permission::ResidentsView)?;
    Ok(Json(
        UsageRecordRepository::new(state.pool())
            .list_month(query.month, query.resident_id)
            .await?,
    ))
}

/// Save one resident's days for a month.
///
/// Days not in the body are left as they are.
///
/// # Errors
///
/// Returns 400 for days outside the month or the residency and 404 for an
/// unknown resident.
#[instrument(skip(staff, state, input))]
pub async fn save_month(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<UsageMonthInput>,
) -> Result<Json<Vec<UsageRecord>>, AppError> {
    staff.require(Permission::UsageRecordsEdit)?;
    let residents = ResidentRepository::new(state.pool());
    let resident = residents
        .get(input.resident_id)
        .await?
        .ok_or_else(|| AppError::NotFound("利用者".to_owned()))?;
    let histories = residents.histories(resident.id).await?;
    let (month, records) = input.validate(&resident, &histories)?;

    let saved = UsageRecordRepository::new(state.pool())
        .upsert_month(resident.id, month, &records)
        .await?;
    tracing::info!(
        resident_id = %resident.id,
        month = %month,
        days = records.len(),
        "Saved usage records"
    );
    Ok(Json(saved))
}

/// Used days per resident and level for a month.
#[instrument(skip(staff, state))]
pub async fn summary(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<UsageSummary>, AppError> {
    staff.require(Permission::ResidentsView)?;
    let records = UsageRecordRepository::new(state.pool())
        .list_month(query.month, None)
        .await?;
    let names: BTreeMap<ResidentId, String> = ResidentRepository::new(state.pool())
        .list(&ResidentFilter::default(), state.today())
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    Ok(Json(summarize_usage(query.month, &records, &names)))
}
