//! Disability history API handlers.
//!
//! The set can be replaced as a whole under a resident, or edited one entry
//! at a time. Either way no entry is written that overlaps another or that
//! would leave the resident with two open entries.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{DisabilityHistoryId, Permission, ResidentId};

use crate::{
    db::ResidentRepository,
    error::AppError,
    models::{
        CurrentStaff,
        resident::{
            DisabilityHistoryEntryInput, DisabilityHistoryInput, DisabilityHistoryView,
            validate_disability_histories,
        },
    },
    state::AppState,
};

use super::extract::{ApiPath, LenientJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/residents/{id}/disability_histories",
            get(index).put(replace),
        )
        .route("/api/disability_histories", post(create))
        .route("/api/disability_histories/{id}", put(update).delete(destroy))
}

/// Body of a disability history replacement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabilityHistoriesInput {
    #[serde(default)]
    pub disability_histories: Vec<DisabilityHistoryInput>,
}

async fn require_resident(repo: &ResidentRepository<'_>, id: ResidentId) -> Result<(), AppError> {
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound("利用者".to_owned()));
    }
    Ok(())
}

/// A resident's disability history, oldest first.
#[instrument(skip(staff, state))]
pub async fn index(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ResidentId>,
) -> Result<Json<Vec<DisabilityHistoryView>>, AppError> {
    staff.require(Permission::ResidentsView)?;
    let repo = ResidentRepository::new(state.pool());
    require_resident(&repo, id).await?;

    let histories = repo.histories(id).await?;
    Ok(Json(histories.iter().map(DisabilityHistoryView::from).collect()))
}

/// Replace the whole set.
///
/// # Errors
///
/// Returns 400 with `disabilityHistories[i]` field errors and 404 for an
/// unknown resident.
#[instrument(skip(staff, state, input))]
pub async fn replace(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ResidentId>,
    LenientJson(input): LenientJson<DisabilityHistoriesInput>,
) -> Result<Json<Vec<DisabilityHistoryView>>, AppError> {
    staff.require(Permission::ResidentsEdit)?;
    let histories = validate_disability_histories(&input.disability_histories)?;

    let saved = ResidentRepository::new(state.pool())
        .replace_histories(id, &histories)
        .await?;
    tracing::info!(resident_id = %id, count = saved.len(), "Replaced disability history");
    Ok(Json(saved.iter().map(DisabilityHistoryView::from).collect()))
}

/// Add one entry to a resident's history.
///
/// # Errors
///
/// Returns 400 when the entry overlaps a stored one or opens a second
/// open-ended entry.
#[instrument(skip(staff, state, input))]
pub async fn create(
    staff: CurrentStaff,
    State(state): State<AppState>,
    LenientJson(input): LenientJson<DisabilityHistoryEntryInput>,
) -> Result<(StatusCode, Json<DisabilityHistoryView>), AppError> {
    staff.require(Permission::ResidentsEdit)?;
    let Some(resident_id) = input.resident_id else {
        return Err(
            ValidationErrors::from(("residentId", "利用者を選択してください".to_owned())).into(),
        );
    };

    let repo = ResidentRepository::new(state.pool());
    require_resident(&repo, resident_id).await?;
    let saved = repo
        .add_history(resident_id, |existing| {
            input.validate(None, existing).map_err(AppError::from)
        })
        .await?;
    tracing::info!(resident_id = %resident_id, history_id = %saved.id, "Added disability history");
    Ok((
        StatusCode::CREATED,
        Json(DisabilityHistoryView::from(&saved)),
    ))
}

/// Change one entry.
///
/// The entry stays with its resident; the overlap check skips the entry
/// itself.
///
/// # Errors
///
/// Returns 400 on a conflict and 404 for an unknown entry.
#[instrument(skip(staff, state, input))]
pub async fn update(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DisabilityHistoryId>,
    LenientJson(input): LenientJson<DisabilityHistoryEntryInput>,
) -> Result<Json<DisabilityHistoryView>, AppError> {
    staff.require(Permission::ResidentsEdit)?;
    let repo = ResidentRepository::new(state.pool());
    let current = repo
        .history(id)
        .await?
        .ok_or_else(|| AppError::NotFound("障害支援区分履歴".to_owned()))?;

    let saved = repo
        .update_history(current.resident_id, id, |existing| {
            input.validate(Some(id), existing).map_err(AppError::from)
        })
        .await?;
    Ok(Json(DisabilityHistoryView::from(&saved)))
}

#[instrument(skip(staff, state))]
pub async fn destroy(
    staff: CurrentStaff,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DisabilityHistoryId>,
) -> Result<StatusCode, AppError> {
    staff.require(Permission::ResidentsEdit)?;
    ResidentRepository::new(state.pool()).delete_history(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
