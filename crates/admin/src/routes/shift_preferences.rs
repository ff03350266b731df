//! Shift preference API handlers.
//!
//! Staff submit and see their own preferences with
//! `shift_preferences.submit`; everyone else's need
//! `shift_preferences.view_all`.

use std::collections::BTreeSet;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tracing::instrument;

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{GroupHomeId, Permission, ShiftPreferenceId, UserId};

use crate::{
    db::{GroupHomeRepository, ShiftPreferenceRepository},
    error::AppError,
    models::{
        CurrentStaff,
        shift_preference::{
            NewShiftPreference, ShiftPreference, ShiftPreferenceFilter, ShiftPreferenceInput,
        },
    },
    state::AppState,
};

use super::extract::{ApiPath, ApiQuery, LenientJson};

const OWN: Permission = Permission::ShiftPreferencesSubmit;
const OTHERS: Permission = Permission::ShiftPreferencesViewAll;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shift_preferences", get(index).post(create))
        .route(
            "/api/shift_preferences/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// The staff member a submission is for: the one named in the body, or the
/// logged-in staff member.
fn target_user(staff: &CurrentStaff, requested: Option<UserId>) -> Result<UserId, AppError> {
    requested.or(staff.staff.user_id).ok_or_else(|| {
        ValidationErrors::from(("userId", "職員を選択してください".to_owned())).into()
    })
}

/// Validate the form and check every entry names a registered home.
async fn validate(
    state: &AppState,
    input: &ShiftPreferenceInput,
    user_id: UserId,
) -> Result<NewShiftPreference, AppError> {
    let mut errors = ValidationErrors::new();
    let homes: BTreeSet<GroupHomeId> = GroupHomeRepository::new(state.pool())
        .list()
        .await?
        .into_iter()
        .map(|h| h.id)
        .collect();
    for (i, entry) in input.entries.iter().enumerate() {
        if !homes.contains(&entry.group_home_id) {
            errors.add(
                format!("entries[{i}].groupHomeId"),
                "存在しないグループホームです",
            );
        }
    }

    match input.validate(user_id) {
        Ok(pref) if errors.is_empty() => Ok(pref),
        Ok(_) => Err(errors.into()),
        Err(mut form_errors) => {
            for (field, message) in errors.iter() {
                form_errors.add(field, message);
            }
            Err(form_errors.into())
        }
    }
}

async fn load(state: &AppState, id: ShiftPreferenceId) -> Result<ShiftPreference, AppError> {
    ShiftPreferenceRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("シフト希望".to_owned()))
}

/// List preferences.
///
/// Without `shift_preferences.view_all` the list is limited to the
/// logged-in staff member.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(mut filter): ApiQuery<ShiftPreferenceFilter>,
) -> Result<Json<Vec<ShiftPreference>>, AppError> {
    match filter.user_id {
        Some(user_id) => staff.require_for(user_id, OWN, OTHERS)?,
        None if staff.can(OTHERS) => {}
        None => {
            staff.require(OWN)?;
            filter.user_id = Some(staff.staff.user_id.ok_or(AppError::Forbidden(
                OTHERS.as_str().to_owned(),
            ))?);
        }
    }

    Ok(Json(
        ShiftPreferenceRepository::new(state.pool())
            .list(&filter)
            .await?,
    ))
}

#[instrument(skip(staff, state))]
pub async fn show(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShiftPreferenceId>,
) -> Result<Json<ShiftPreference>, AppError> {
    let pref = load(&state, id).await?;
    staff.require_for(pref.user_id, OWN, OTHERS)?;
    Ok(Json(pref))
}

/// Submit a month's preference.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 when the month was already
/// submitted.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<ShiftPreferenceInput>,
) -> Result<(StatusCode, Json<ShiftPreference>), AppError> {
    let user_id = target_user(&staff, input.user_id)?;
    staff.require_for(user_id, OWN, OTHERS)?;
    let new_pref = validate(&state, &input, user_id).await?;

    let pref = ShiftPreferenceRepository::new(state.pool())
        .create(&new_pref)
        .await?;
    tracing::info!(user_id = %user_id, month = %pref.target_month, "Submitted shift preference");
    Ok((StatusCode::CREATED, Json(pref)))
}

#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShiftPreferenceId>,
    LenientJson(input): LenientJson<ShiftPreferenceInput>,
) -> Result<Json<ShiftPreference>, AppError> {
    let current = load(&state, id).await?;
    staff.require_for(current.user_id, OWN, OTHERS)?;
    let user_id = input.user_id.unwrap_or(current.user_id);
    staff.require_for(user_id, OWN, OTHERS)?;
    let new_pref = validate(&state, &input, user_id).await?;

    Ok(Json(
        ShiftPreferenceRepository::new(state.pool())
            .update(id, &new_pref)
            .await?,
    ))
}

#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ShiftPreferenceId>,
) -> Result<StatusCode, AppError> {
    let current = load(&state, id).await?;
    staff.require_for(current.user_id, OWN, OTHERS)?;
    ShiftPreferenceRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
