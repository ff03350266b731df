//! Authentication extractor for admin.
//!
//! Handlers take a [`CurrentStaff`] argument to require a logged-in staff
//! member. With demo login enabled, a session without a staff member is
//! logged in as the configured demo admin on first use.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use grouphome_core::SystemRole;

use crate::config::DemoLoginConfig;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentStaff, SessionStaff, session_keys};
use crate::state::AppState;

impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::Unauthorized)?;

        let staff = match session.get::<SessionStaff>(session_keys::CURRENT_STAFF).await? {
            Some(staff) => staff,
            None if state.config().demo.enabled => {
                let staff = demo_admin(&state.config().demo);
                set_current_staff(session, &staff).await?;
                tracing::info!(email = %staff.email, "Demo admin logged in");
                staff
            }
            None => return Err(AppError::Unauthorized),
        };

        let permissions = state
            .permissions()
            .resolve(state.pool(), &staff.role_name)
            .await?;
        set_sentry_user(staff.user_id.map(i32::from), &staff.email);

        Ok(Self { staff, permissions })
    }
}

/// The staff identity used for demo auto-login.
#[must_use]
pub fn demo_admin(demo: &DemoLoginConfig) -> SessionStaff {
    SessionStaff {
        user_id: demo.user_id,
        name: demo.name.clone(),
        email: demo.email.clone(),
        role_name: SystemRole::Admin.as_str().to_owned(),
    }
}

/// Helper to set the current staff member in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &SessionStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_STAFF, staff).await
}

/// Helper to clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_admin_uses_admin_role() {
        let demo = DemoLoginConfig {
            enabled: true,
            name: "管理者".to_owned(),
            email: "admin@example.com".to_owned(),
            user_id: None,
        };
        let staff = demo_admin(&demo);
        assert_eq!(staff.role_name, "admin");
        assert_eq!(staff.user_id, None);
        assert_eq!(staff.email, "admin@example.com");
    }
}
