//! Core types for the group-home admin system.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod disability;
pub mod email;
pub mod id;
pub mod month;
pub mod permission;
pub mod status;

pub use disability::DisabilityLevel;
pub use email::{Email, EmailError};
pub use id::*;
pub use month::{MonthParseError, YearMonth};
pub use permission::{
    PERMISSION_CATALOG, Permission, PermissionInfo, PermissionSet, SystemRole, has_permission,
};
pub use status::{RecordStatus, StatusCheck, derive_status};
