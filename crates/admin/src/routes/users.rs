//! Staff (user) API handlers, including department history.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tracing::instrument;

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{Permission, UserId};

use crate::{
    db::{RoleRepository, UserRepository},
    error::AppError,
    models::{
        CurrentStaff,
        user::{
            DepartmentHistoryInput, DepartmentHistoryView, NewUser, UserFilter, UserInput,
            UserView, validate_department_histories,
        },
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index).post(create))
        .route("/api/users/{id}", get(show).put(update).delete(destroy))
        .route(
            "/api/users/{id}/department_histories",
            get(histories).put(replace_histories),
        )
}

/// Body of a department history replacement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentHistoriesInput {
    #[serde(default)]
    pub department_histories: Vec<DepartmentHistoryInput>,
}

/// Reject role names with no matching role row.
async fn check_role(state: &AppState, user: &NewUser) -> Result<(), AppError> {
    if RoleRepository::new(state.pool())
        .get_by_name(&user.role_name)
        .await?
        .is_none()
    {
        return Err(ValidationErrors::from(("roleName", "存在しない役割です".to_owned())).into());
    }
    Ok(())
}

/// List staff with derived status and current department.
///
/// # Errors
///
/// Returns 403 without `users.view`.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<UserView>>, AppError> {
    staff.require(Permission::UsersView)?;
    let today = state.today();
    let repo = UserRepository::new(state.pool());

    let users = repo.list(&filter, today).await?;
    let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
    let mut histories = repo.histories_for(&ids).await?;

    let views = users
        .into_iter()
        .map(|user| {
            let own = histories.remove(&user.id).unwrap_or_default();
            UserView::new(user, &own, today)
        })
        .collect();
    Ok(Json(views))
}

/// Get one staff member.
///
/// # Errors
///
/// Returns 403 without `users.view` and 404 for an unknown ID.
#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<UserView>, AppError> {
    staff.require(Permission::UsersView)?;
    let repo = UserRepository::new(state.pool());

    let user = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("職員".to_owned()))?;
    let histories = repo.histories(id).await?;
    Ok(Json(UserView::new(user, &histories, state.today())))
}

/// Create a staff member, optionally with department history.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 for a taken email.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<UserInput>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    staff.require(Permission::UsersEdit)?;
    let today = state.today();
    let new_user = input.validate(today)?;
    check_role(&state, &new_user).await?;

    let repo = UserRepository::new(state.pool());
    let user = repo.create(&new_user).await?;
    let histories = repo.histories(user.id).await?;
    tracing::info!(user_id = %user.id, "Created user");

    Ok((
        StatusCode::CREATED,
        Json(UserView::new(user, &histories, today)),
    ))
}

/// Update a staff member.
///
/// Department history is replaced only when the body includes
/// `departmentHistories`.
///
/// # Errors
///
/// Returns 400 for invalid input, 404 for an unknown ID and 409 for a taken
/// email.
#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    LenientJson(input): LenientJson<UserInput>,
) -> Result<Json<UserView>, AppError> {
    staff.require(Permission::UsersEdit)?;
    let today = state.today();
    let new_user = input.validate(today)?;
    check_role(&state, &new_user).await?;

    let repo = UserRepository::new(state.pool());
    let user = repo.update(id, &new_user).await?;
    let histories = repo.histories(id).await?;
    tracing::info!(user_id = %id, "Updated user");

    Ok(Json(UserView::new(user, &histories, today)))
}

/// Delete a staff member.
///
/// # Errors
///
/// Returns 400 when deleting yourself and 404 for an unknown ID.
#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::UsersEdit)?;
    if staff.is_self(id) {
        return Err(AppError::BadRequest("自分自身は削除できません".to_owned()));
    }

    UserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(user_id = %id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

/// A staff member's department history, oldest first.
///
/// # Errors
///
/// Returns 404 for an unknown user.
#[instrument(skip(staff, state))]
pub async fn histories(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Vec<DepartmentHistoryView>>, AppError> {
    staff.require(Permission::UsersView)?;
    let repo = UserRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound("職員".to_owned()));
    }

    let histories = repo.histories(id).await?;
    Ok(Json(histories.iter().map(DepartmentHistoryView::from).collect()))
}

/// Replace the whole department history set.
///
/// The set is checked for overlaps and for more than one open entry before
/// anything is written.
///
/// # Errors
///
/// Returns 400 with `departmentHistories[i]` field errors and 404 for an
/// unknown user.
#[instrument(skip(staff, state, input))]
pub async fn replace_histories(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    LenientJson(input): LenientJson<DepartmentHistoriesInput>,
) -> Result<Json<Vec<DepartmentHistoryView>>, AppError> {
    staff.require(Permission::UsersEdit)?;
    let histories = validate_department_histories(&input.department_histories)?;

    let saved = UserRepository::new(state.pool())
        .replace_histories(id, &histories)
        .await?;
    tracing::info!(user_id = %id, count = saved.len(), "Replaced department history");

    Ok(Json(saved.iter().map(DepartmentHistoryView::from).collect()))
}
