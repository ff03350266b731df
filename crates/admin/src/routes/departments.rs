//! Department API handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use grouphome_core::{DepartmentId, Permission};

use crate::{
    db::DepartmentRepository,
    error::AppError,
    models::{
        CurrentStaff,
        department::{Department, DepartmentInput},
    },
    state::AppState,
};

use super::extract::{ApiPath, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/departments", get(index).post(create))
        .route("/api/departments/{id}", put(update).delete(destroy))
}

#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Department>>, AppError> {
    staff.require(Permission::UsersView)?;
    Ok(Json(DepartmentRepository::new(state.pool()).list().await?))
}

/// Create a department.
///
/// # Errors
///
/// Returns 400 for a blank name and 409 for a duplicate.
#[instrument(skip(staff, state))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<DepartmentInput>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    staff.require(Permission::DepartmentsEdit)?;
    let name = input.validate()?;
    let department = DepartmentRepository::new(state.pool()).create(&name).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

/// Rename a department.
///
/// # Errors
///
/// Returns 404 for an unknown ID and 409 for a duplicate name.
#[instrument(skip(staff, state))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DepartmentId>,
    LenientJson(input): LenientJson<DepartmentInput>,
) -> Result<Json<Department>, AppError> {
    staff.require(Permission::DepartmentsEdit)?;
    let name = input.validate()?;
    Ok(Json(
        DepartmentRepository::new(state.pool())
            .update(id, &name)
            .await?,
    ))
}

/// Delete a department.
///
/// # Errors
///
/// Returns 409 while any department history still references it.
#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DepartmentId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::DepartmentsEdit)?;
    DepartmentRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
