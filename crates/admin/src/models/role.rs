//! Role domain types.
//!
//! System roles (`admin`, `staff`, `payroll`) are seeded with the static
//! permission table and cannot be changed through the API. Custom roles store
//! their permission set as a JSON array of permission names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::validation::ValidationErrors;
use grouphome_core::{Permission, PermissionSet, RoleId, SystemRole};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub permissions: PermissionSet,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A validated custom role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    pub permissions: PermissionSet,
}

fn is_role_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl RoleInput {
    /// Validate a custom role.
    ///
    /// # Errors
    ///
    /// Returns field errors for a malformed or reserved name, a blank display
    /// name, or unknown permission names.
    pub fn validate(&self) -> Result<NewRole, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim();

        errors.require("name", "ロール名", name);
        errors.max_chars("name", "ロール名", name, 50);
        if !name.is_empty() && !is_role_name(name) {
            errors.add(
                "name",
                "ロール名は英小文字で始まる英小文字・数字・アンダースコアで入力してください",
            );
        }
        if SystemRole::from_name(name).is_some() {
            errors.add("name", format_args!("「{name}」はシステムロールのため使用できません"));
        }

        errors.require("displayName", "表示名", &self.display_name);
        errors.max_chars("displayName", "表示名", self.display_name.trim(), 100);

        let mut permissions = Vec::with_capacity(self.permissions.len());
        for raw in &self.permissions {
            match raw.parse::<Permission>() {
                Ok(p) => permissions.push(p),
                Err(_) => errors.add("permissions", format_args!("不明な権限です: {raw}")),
            }
        }

        errors.into_result().map(|()| NewRole {
            name: name.to_owned(),
            display_name: self.display_name.trim().to_owned(),
            permissions: permissions.into_iter().collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(name: &str, permissions: &[&str]) -> RoleInput {
        RoleInput {
            name: name.to_owned(),
            display_name: "サービス管理責任者".to_owned(),
            permissions: permissions.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn test_valid_role() {
        let role = input("service_manager", &["residents.view", "residents.edit"])
            .validate()
            .unwrap();
        assert_eq!(role.permissions.len(), 2);
        assert!(role.permissions.has(Permission::ResidentsEdit));
    }

    #[test]
    fn test_system_name_reserved() {
        let errors = input("admin", &[]).validate().unwrap_err();
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn test_unknown_permission() {
        let errors = input("night", &["residents.fly"]).validate().unwrap_err();
        assert_eq!(errors.get("permissions"), Some("不明な権限です: residents.fly"));
    }

    #[test]
    fn test_name_format() {
        assert!(input("Night-Shift", &[]).validate().is_err());
        assert!(input("night_shift2", &[]).validate().is_ok());
    }
}
