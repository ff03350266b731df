//! Session API handlers.
//!
//! `GET` returns the logged-in staff member (logging in the demo admin when
//! enabled), `DELETE` logs out, and `POST` switches to another staff member
//! while demo login is on.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use grouphome_core::{RecordStatus, UserId, derive_status};

use crate::{
    db::UserRepository,
    error::{AppError, clear_sentry_user},
    middleware::{clear_current_staff, set_current_staff},
    models::{CurrentStaff, SessionStaff},
    state::AppState,
};

use super::extract::LenientJson;

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/session", get(show).post(switch).delete(logout))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRequest {
    pub user_id: UserId,
}

/// Current staff member and permissions.
#[instrument(skip_all)]
pub async fn show(staff: CurrentStaff) -> Json<CurrentStaff> {
    Json(staff)
}

/// Log in as another staff member (demo login only).
///
/// # Errors
///
/// Returns 403 when demo login is off, 404 for an unknown user and 400 for a
/// retired one.
#[instrument(skip(state, session))]
pub async fn switch(
    State(state): State<AppState>,
    session: Session,
    LenientJson(body): LenientJson<SwitchRequest>,
) -> Result<Json<SessionStaff>, AppError> {
    if !state.config().demo.enabled {
        return Err(AppError::Forbidden("session.switch".to_owned()));
    }

    let user = UserRepository::new(state.pool())
        .get(body.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("職員".to_owned()))?;
    if derive_status(user.retirement_date, state.today()) == RecordStatus::Inactive {
        return Err(AppError::BadRequest(
            "退職済みの職員ではログインできません".to_owned(),
        ));
    }

    let staff = SessionStaff {
        user_id: Some(user.id),
        name: user.name,
        email: user.email.to_string(),
        role_name: user.role_name,
    };
    session.cycle_id().await?;
    set_current_staff(&session, &staff).await?;
    tracing::info!(user_id = %user.id, "Switched session user");

    Ok(Json(staff))
}

/// Log out.
///
/// With demo login enabled the next request logs the demo admin back in.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_staff(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
