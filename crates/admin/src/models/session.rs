//! Session-related types for staff authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use grouphome_core::{Permission, PermissionSet, UserId};

use crate::error::AppError;

/// Session-stored staff identity.
///
/// Minimal data stored in the session to identify the logged-in staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStaff {
    /// Staff database ID. `None` for a demo admin with no matching user row.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: String,
    /// Name of the role whose permissions apply.
    pub role_name: String,
}

/// The logged-in staff member with resolved permissions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStaff {
    #[serde(flatten)]
    pub staff: SessionStaff,
    pub permissions: PermissionSet,
}

impl CurrentStaff {
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        grouphome_core::has_permission(&self.permissions, permission)
    }

    /// Fail with 403 unless the permission is granted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the permission is missing.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(permission.as_str().to_owned()))
        }
    }

    /// Whether `user_id` is the logged-in staff member.
    #[must_use]
    pub fn is_self(&self, user_id: UserId) -> bool {
        self.staff.user_id == Some(user_id)
    }

    /// Require `own` for the staff member's own records and `others` for
    /// everyone else's.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the applicable permission is missing.
    pub fn require_for(
        &self,
        user_id: UserId,
        own: Permission,
        others: Permission,
    ) -> Result<(), AppError> {
        if self.is_self(user_id) {
            self.require(own)
        } else {
            self.require(others)
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use grouphome_core::SystemRole;

    fn staff(role: SystemRole, user_id: i32) -> CurrentStaff {
        CurrentStaff {
            staff: SessionStaff {
                user_id: Some(UserId::new(user_id)),
                name: "山田 花子".to_owned(),
                email: "hanako@example.jp".to_owned(),
                role_name: role.as_str().to_owned(),
            },
            permissions: role.permissions(),
        }
    }

    #[test]
    fn test_staff_can_submit_own_preferences_only() {
        let s = staff(SystemRole::Staff, 7);
        assert!(
            s.require_for(
                UserId::new(7),
                Permission::ShiftPreferencesSubmit,
                Permission::ShiftPreferencesViewAll
            )
            .is_ok()
        );
        assert!(matches!(
            s.require_for(
                UserId::new(8),
                Permission::ShiftPreferencesSubmit,
                Permission::ShiftPreferencesViewAll
            ),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(staff(SystemRole::Payroll, 1)).unwrap();
        assert_eq!(json["roleName"], "payroll");
        assert!(json["permissions"].as_array().is_some_and(|p| !p.is_empty()));
    }
}
