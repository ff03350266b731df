//! Role API handlers.
//!
//! System roles are listed alongside custom roles but cannot be changed or
//! deleted. Changing a custom role evicts it from the permission cache.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use grouphome_core::{Permission, RoleId};

use crate::{
    db::RoleRepository,
    error::AppError,
    models::{
        CurrentStaff,
        role::{Role, RoleInput},
    },
    state::AppState,
};

use super::extract::{ApiPath, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/roles", get(index).post(create))
        .route("/api/roles/{id}", get(show).put(update).delete(destroy))
}

/// Load a custom role, refusing system roles.
async fn editable_role(state: &AppState, id: RoleId) -> Result<Role, AppError> {
    let role = RoleRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("役割".to_owned()))?;
    if role.is_system {
        return Err(AppError::Forbidden("roles.system".to_owned()));
    }
    Ok(role)
}

#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Role>>, AppError> {
    staff.require(Permission::UsersView)?;
    Ok(Json(RoleRepository::new(state.pool()).list().await?))
}

#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RoleId>,
) -> Result<Json<Role>, AppError> {
    staff.require(Permission::UsersView)?;
    RoleRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("役割".to_owned()))
}

/// Create a custom role.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 for a duplicate name.
#[instrument(skip(staff, state))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<RoleInput>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    staff.require(Permission::RolesManage)?;
    let new_role = input.validate()?;
    let role = RoleRepository::new(state.pool()).create(&new_role).await?;
    state.permissions().invalidate(&role.name).await;
    tracing::info!(role = %role.name, "Created role");
    Ok((StatusCode::CREATED, Json(role)))
}

/// Update a custom role.
///
/// # Errors
///
/// Returns 403 for a system role and 404 for an unknown ID.
#[instrument(skip(staff, state))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RoleId>,
    LenientJson(input): LenientJson<RoleInput>,
) -> Result<Json<Role>, AppError> {
    staff.require(Permission::RolesManage)?;
    let current = editable_role(&state, id).await?;
    let new_role = input.validate()?;

    let role = RoleRepository::new(state.pool())
        .update(id, &new_role)
        .await?;
    state.permissions().invalidate(&current.name).await;
    state.permissions().invalidate(&role.name).await;
    tracing::info!(role = %role.name, "Updated role");
    Ok(Json(role))
}

/// Delete a custom role.
///
/// # Errors
///
/// Returns 403 for a system role and 409 while staff still hold it.
#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RoleId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::RolesManage)?;
    let current = editable_role(&state, id).await?;

    RoleRepository::new(state.pool()).delete(id).await?;
    state.permissions().invalidate(&current.name).await;
    tracing::info!(role = %current.name, "Deleted role");
    Ok(StatusCode::NO_CONTENT)
}
