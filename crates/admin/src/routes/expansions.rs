//! Expansion (増床) API handlers.

use std::collections::BTreeSet;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use grouphome_core::{ExpansionId, Permission};

use crate::{
    db::ExpansionRepository,
    error::AppError,
    models::{
        CurrentStaff,
        expansion::{Expansion, ExpansionFilter, ExpansionInput},
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};
use super::group_homes::load_home;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/expansions", get(index).post(create))
        .route("/api/expansions/{id}", get(show).put(update).delete(destroy))
}

/// Rooms the expansion may not reuse: the home's base rooms plus every
/// other expansion's rooms.
async fn taken_rooms(
    state: &AppState,
    input: &ExpansionInput,
    editing: Option<ExpansionId>,
) -> Result<BTreeSet<String>, AppError> {
    let Some(home_id) = input.group_home_id else {
        return Ok(BTreeSet::new());
    };
    let home = load_home(state, home_id).await?;
    let expansions = ExpansionRepository::new(state.pool())
        .list(Some(home_id))
        .await?;

    Ok(home
        .room_numbers
        .into_iter()
        .chain(
            expansions
                .into_iter()
                .filter(|e| Some(e.id) != editing)
                .flat_map(|e| e.room_numbers),
        )
        .collect())
}

#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ExpansionFilter>,
) -> Result<Json<Vec<Expansion>>, AppError> {
    staff.require(Permission::GroupHomesView)?;
    Ok(Json(
        ExpansionRepository::new(state.pool())
            .list(filter.group_home_id)
            .await?,
    ))
}

#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ExpansionId>,
) -> Result<Json<Expansion>, AppError> {
    staff.require(Permission::GroupHomesView)?;
    ExpansionRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("増床".to_owned()))
}

/// Register an expansion.
///
/// # Errors
///
/// Returns 400 for invalid input or rooms the home already has, and 404 for
/// an unknown home.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<ExpansionInput>,
) -> Result<(StatusCode, Json<Expansion>), AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    let taken = taken_rooms(&state, &input, None).await?;
    let new_expansion = input.validate(&taken)?;

    let expansion = ExpansionRepository::new(state.pool())
        .create(&new_expansion)
        .await?;
    tracing::info!(expansion_id = %expansion.id, group_home_id = %expansion.group_home_id, "Created expansion");
    Ok((StatusCode::CREATED, Json(expansion)))
}

#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ExpansionId>,
    LenientJson(input): LenientJson<ExpansionInput>,
) -> Result<Json<Expansion>, AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    let taken = taken_rooms(&state, &input, Some(id)).await?;
    let new_expansion = input.validate(&taken)?;

    Ok(Json(
        ExpansionRepository::new(state.pool())
            .update(id, &new_expansion)
            .await?,
    ))
}

#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ExpansionId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::GroupHomesEdit)?;
    ExpansionRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
