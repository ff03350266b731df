//! Services shared across handlers.
//!
//! - `permissions` - role → permission resolution with a short-lived cache

pub mod permissions;

pub use permissions::PermissionResolver;
