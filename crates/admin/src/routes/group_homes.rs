//! Group home API handlers, including the room roster.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use grouphome_core::rooms::roster_on;
use grouphome_core::{GroupHomeId, Permission};

use crate::{
    db::{ExpansionRepository, GroupHomeRepository},
    error::AppError,
    models::{
        CurrentStaff,
        expansion::Expansion,
        group_home::{GroupHome, GroupHomeInput, RoomRoster, RosterQuery},
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/group-homes", get(index).post(create))
        .route("/api/group-homes/{id}", get(show).put(update).delete(destroy))
        .route("/api/group-homes/{id}/rooms", get(rooms))
}

pub(crate) async fn load_home(state: &AppState, id: GroupHomeId) -> Result<GroupHome, AppError> {
    GroupHomeRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("グループホーム".to_owned()))
}

/// Rooms of `home` in effect on `date`, counting started expansions.
pub(crate) async fn roster(
    state: &AppState,
    home: &GroupHome,
    date: chrono::NaiveDate,
) -> Result<RoomRoster, AppError> {
    let expansions = ExpansionRepository::new(state.pool())
        .list(Some(home.id))
        .await?;
    Ok(RoomRoster {
        group_home_id: home.id,
        date,
        rooms: roster_on(
            &home.room_numbers,
            expansions.iter().map(Expansion::as_addition),
            date,
        ),
    })
}

#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupHome>>, AppError> {
    staff.require(Permission::GroupHomesView)?;
    Ok(Json(GroupHomeRepository::new(state.pool()).list().await?))
}

#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupHomeId>,
) -> Result<Json<GroupHome>, AppError> {
    staff.require(Permission::GroupHomesView)?;
    Ok(Json(load_home(&state, id).await?))
}

/// Register a group home.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 for a duplicate facility code.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<GroupHomeInput>,
) -> Result<(StatusCode, Json<GroupHome>), AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    let new_home = input.validate()?;
    let home = GroupHomeRepository::new(state.pool())
        .create(&new_home)
        .await?;
    tracing::info!(group_home_id = %home.id, "Created group home");
    Ok((StatusCode::CREATED, Json(home)))
}

#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupHomeId>,
    LenientJson(input): LenientJson<GroupHomeInput>,
) -> Result<Json<GroupHome>, AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    let new_home = input.validate()?;
    Ok(Json(
        GroupHomeRepository::new(state.pool())
            .update(id, &new_home)
            .await?,
    ))
}

/// Delete a group home and its expansions.
///
/// Residents and attendance records keep their rows with the home cleared.
#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupHomeId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    GroupHomeRepository::new(state.pool()).delete(id).await?;
    tracing::info!(group_home_id = %id, "Deleted group home");
    Ok(StatusCode::NO_CONTENT)
}

/// Room roster on `date` (default: today).
///
/// # Errors
///
/// Returns 404 for an unknown home.
#[instrument(skip(staff, state))]
pub async fn rooms(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupHomeId>,
    ApiQuery(query): ApiQuery<RosterQuery>,
) -> Result<Json<RoomRoster>, AppError> {
    staff.require(Permission::GroupHomesView)?;
    let home = load_home(&state, id).await?;
    let date = query.date.unwrap_or_else(|| state.today());
    Ok(Json(roster(&state, &home, date).await?))
}
