//! Permissions and the static system-role table.
//!
//! The permission gate is a pure lookup: a role resolves to a set of
//! [`Permission`]s and every check is `set.contains(p)`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "users.view")]
    UsersView,
    #[serde(rename = "users.edit")]
    UsersEdit,
    #[serde(rename = "departments.edit")]
    DepartmentsEdit,
    #[serde(rename = "roles.manage")]
    RolesManage,
    #[serde(rename = "group_homes.view")]
    GroupHomesView,
    #[serde(rename = "group_homes.edit")]
    GroupHomesEdit,
    #[serde(rename = "residents.view")]
    ResidentsView,
    #[serde(rename = "residents.edit")]
    ResidentsEdit,
    #[serde(rename = "shift_preferences.submit")]
    ShiftPreferencesSubmit,
    #[serde(rename = "shift_preferences.view_all")]
    ShiftPreferencesViewAll,
    #[serde(rename = "usage_records.edit")]
    UsageRecordsEdit,
    #[serde(rename = "attendance.record")]
    AttendanceRecord,
    #[serde(rename = "attendance.view_all")]
    AttendanceViewAll,
    #[serde(rename = "attendance.report")]
    AttendanceReport,
}

/// Catalog entry describing a permission for the role editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionInfo {
    pub name: Permission,
    pub category: &'static str,
    pub description: &'static str,
}

/// Every permission with its category and description.
pub const PERMISSION_CATALOG: &[PermissionInfo] = &[
    PermissionInfo {
        name: Permission::UsersView,
        category: "職員管理",
        description: "職員一覧・詳細の閲覧",
    },
    PermissionInfo {
        name: Permission::UsersEdit,
        category: "職員管理",
        description: "職員の登録・編集・削除",
    },
    PermissionInfo {
        name: Permission::DepartmentsEdit,
        category: "職員管理",
        description: "部署の登録・編集・削除",
    },
    PermissionInfo {
        name: Permission::RolesManage,
        category: "職員管理",
        description: "ロールと権限の管理",
    },
    PermissionInfo {
        name: Permission::GroupHomesView,
        category: "施設管理",
        description: "グループホーム・増床情報の閲覧",
    },
    PermissionInfo {
        name: Permission::GroupHomesEdit,
        category: "施設管理",
        description: "グループホーム・増床情報の登録・編集",
    },
    PermissionInfo {
        name: Permission::ResidentsView,
        category: "利用者管理",
        description: "利用者一覧・詳細の閲覧",
    },
    PermissionInfo {
        name: Permission::ResidentsEdit,
        category: "利用者管理",
        description: "利用者・障害支援区分履歴の登録・編集",
    },
    PermissionInfo {
        name: Permission::ShiftPreferencesSubmit,
        category: "シフト",
        description: "自分のシフト希望の提出",
    },
    PermissionInfo {
        name: Permission::ShiftPreferencesViewAll,
        category: "シフト",
        description: "全職員のシフト希望の閲覧",
    },
    PermissionInfo {
        name: Permission::UsageRecordsEdit,
        category: "利用実績",
        description: "利用実績の記録",
    },
    PermissionInfo {
        name: Permission::AttendanceRecord,
        category: "勤怠",
        description: "自分の勤怠の記録",
    },
    PermissionInfo {
        name: Permission::AttendanceViewAll,
        category: "勤怠",
        description: "全職員の勤怠の閲覧・修正",
    },
    PermissionInfo {
        name: Permission::AttendanceReport,
        category: "勤怠",
        description: "月次勤怠レポートの出力",
    },
];

impl Permission {
    /// Wire/database name, e.g. `residents.edit`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UsersView => "users.view",
            Self::UsersEdit => "users.edit",
            Self::DepartmentsEdit => "departments.edit",
            Self::RolesManage => "roles.manage",
            Self::GroupHomesView => "group_homes.view",
            Self::GroupHomesEdit => "group_homes.edit",
            Self::ResidentsView => "residents.view",
            Self::ResidentsEdit => "residents.edit",
            Self::ShiftPreferencesSubmit => "shift_preferences.submit",
            Self::ShiftPreferencesViewAll => "shift_preferences.view_all",
            Self::UsageRecordsEdit => "usage_records.edit",
            Self::AttendanceRecord => "attendance.record",
            Self::AttendanceViewAll => "attendance.view_all",
            Self::AttendanceReport => "attendance.report",
        }
    }

    /// Catalog entry for this permission.
    #[must_use]
    pub fn info(&self) -> Option<&'static PermissionInfo> {
        PERMISSION_CATALOG.iter().find(|i| i.name == *self)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PERMISSION_CATALOG
            .iter()
            .map(|i| i.name)
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {s}"))
    }
}

/// The three seeded roles. They cannot be edited or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Admin,
    Staff,
    Payroll,
}

impl SystemRole {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Staff, Self::Payroll];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Payroll => "payroll",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Admin => "管理者",
            Self::Staff => "職員",
            Self::Payroll => "給与担当",
        }
    }

    /// Look up a system role by its role name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// Permissions granted by this role.
    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        use Permission::{
            AttendanceRecord, AttendanceReport, AttendanceViewAll, GroupHomesView,
            ResidentsView, ShiftPreferencesSubmit, ShiftPreferencesViewAll, UsageRecordsEdit,
            UsersView,
        };

        match self {
            Self::Admin => PERMISSION_CATALOG.iter().map(|i| i.name).collect(),
            Self::Staff => [
                UsersView,
                GroupHomesView,
                ResidentsView,
                ShiftPreferencesSubmit,
                UsageRecordsEdit,
                AttendanceRecord,
            ]
            .into_iter()
            .collect(),
            Self::Payroll => [
                UsersView,
                ShiftPreferencesViewAll,
                AttendanceRecord,
                AttendanceViewAll,
                AttendanceReport,
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// A resolved set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Evaluate whether `permissions` grants `permission`.
#[must_use]
pub fn has_permission(permissions: &PermissionSet, permission: Permission) -> bool {
    permissions.has(permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_every_permission() {
        let perms = SystemRole::Admin.permissions();
        assert_eq!(perms.len(), PERMISSION_CATALOG.len());
        for info in PERMISSION_CATALOG {
            assert!(has_permission(&perms, info.name));
        }
    }

    #[test]
    fn test_staff_cannot_manage_roles_or_report() {
        let perms = SystemRole::Staff.permissions();
        assert!(has_permission(&perms, Permission::ResidentsView));
        assert!(has_permission(&perms, Permission::UsageRecordsEdit));
        assert!(!has_permission(&perms, Permission::RolesManage));
        assert!(!has_permission(&perms, Permission::ResidentsEdit));
        assert!(!has_permission(&perms, Permission::AttendanceReport));
    }

    #[test]
    fn test_payroll_reports_attendance() {
        let perms = SystemRole::Payroll.permissions();
        assert!(has_permission(&perms, Permission::AttendanceReport));
        assert!(has_permission(&perms, Permission::AttendanceViewAll));
        assert!(!has_permission(&perms, Permission::ResidentsView));
    }

    #[test]
    fn test_permission_names_roundtrip() {
        for info in PERMISSION_CATALOG {
            assert_eq!(info.name.as_str().parse::<Permission>(), Ok(info.name));
            let json = serde_json::to_string(&info.name).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", info.name.as_str()));
        }
        assert!("residents.destroy".parse::<Permission>().is_err());
    }

    #[test]
    fn test_system_role_lookup() {
        assert_eq!(SystemRole::from_name("payroll"), Some(SystemRole::Payroll));
        assert_eq!(SystemRole::from_name("night_shift"), None);
    }
}
