//! Permission catalog for the role editor.

use axum::{Json, Router, routing::get};

use grouphome_core::{PERMISSION_CATALOG, PermissionInfo};

use crate::{error::AppError, models::CurrentStaff, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/permissions", get(catalog))
}

/// Every permission with its category and description.
///
/// # Errors
///
/// Returns 401 without a session.
pub async fn catalog(_staff: CurrentStaff) -> Result<Json<&'static [PermissionInfo]>, AppError> {
    Ok(Json(PERMISSION_CATALOG))
}
