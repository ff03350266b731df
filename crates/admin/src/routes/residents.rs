//! Resident API handlers.

use std::collections::BTreeSet;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{Permission, ResidentId};

use crate::{
    db::{GroupHomeRepository, ResidentRepository},
    error::AppError,
    models::{
        CurrentStaff,
        resident::{ResidentFilter, ResidentInput, ResidentView},
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};
use super::group_homes::roster;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/residents", get(index).post(create))
        .route("/api/residents/{id}", get(show).put(update).delete(destroy))
}

/// The selected home's rooms on the resident's move-in date.
async fn roster_for(
    state: &AppState,
    input: &ResidentInput,
) -> Result<Option<BTreeSet<String>>, AppError> {
    let Some(home_id) = input.group_home_id else {
        return Ok(None);
    };
    let Some(home) = GroupHomeRepository::new(state.pool()).get(home_id).await? else {
        return Err(ValidationErrors::from((
            "groupHomeId",
            "存在しないグループホームです".to_owned(),
        ))
        .into());
    };
    let date = input.roster_date(state.today());
    Ok(Some(roster(state, &home, date).await?.rooms))
}

/// List residents with derived status and current disability level.
///
/// # Errors
///
/// Returns 403 without `residents.view`.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ResidentFilter>,
) -> Result<Json<Vec<ResidentView>>, AppError> {
    staff.require(Permission::ResidentsView)?;
    let today = state.today();
    let repo = ResidentRepository::new(state.pool());

    let residents = repo.list(&filter, today).await?;
    let ids: Vec<ResidentId> = residents.iter().map(|r| r.id).collect();
    let mut histories = repo.histories_for(&ids).await?;

    let views = residents
        .into_iter()
        .map(|resident| {
            let own = histories.remove(&resident.id).unwrap_or_default();
            ResidentView::new(resident, &own, today)
        })
        .collect();
    Ok(Json(views))
}

#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ResidentId>,
) -> Result<Json<ResidentView>, AppError> {
    staff.require(Permission::ResidentsView)?;
    let repo = ResidentRepository::new(state.pool());

    let resident = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("利用者".to_owned()))?;
    let histories = repo.histories(id).await?;
    Ok(Json(ResidentView::new(resident, &histories, state.today())))
}

/// Register a resident, optionally with disability history.
///
/// # Errors
///
/// Returns 400 for invalid input, including a room the home does not have
/// on the move-in date.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<ResidentInput>,
) -> Result<(StatusCode, Json<ResidentView>), AppError> {
    staff.require(Permission::ResidentsEdit)?;
    let today = state.today();
    let rooms = roster_for(&state, &input).await?;
    let new_resident = input.validate(rooms.as_ref(), today)?;

    let repo = ResidentRepository::new(state.pool());
    let resident = repo.create(&new_resident).await?;
    let histories = repo.histories(resident.id).await?;
    tracing::info!(resident_id = %resident.id, "Created resident");

    Ok((
        StatusCode::CREATED,
        Json(ResidentView::new(resident, &histories, today)),
    ))
}

/// Update a resident.
///
/// Disability history is replaced only when the body includes
/// `disabilityHistories`.
///
/// # Errors
///
/// Returns 400 for invalid input and 404 for an unknown ID.
#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ResidentId>,
    LenientJson(input): LenientJson<ResidentInput>,
) -> Result<Json<ResidentView>, AppError> {
    staff.require(Permission::ResidentsEdit)?;
    let today = state.today();
    let rooms = roster_for(&state, &input).await?;
    let new_resident = input.validate(rooms.as_ref(), today)?;

    let repo = ResidentRepository::new(state.pool());
    let resident = repo.update(id, &new_resident).await?;
    let histories = repo.histories(id).await?;
    tracing::info!(resident_id = %id, status = %resident.status, "Updated resident");

    Ok(Json(ResidentView::new(resident, &histories, today)))
}

/// Delete a resident with their history and usage records.
#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ResidentId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::ResidentsEdit)?;
    ResidentRepository::new(state.pool()).delete(id).await?;
    tracing::info!(resident_id = %id, "Deleted resident");
    Ok(StatusCode::NO_CONTENT)
}
