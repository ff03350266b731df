//! Domain models for the admin API.
//!
//! Each entity module holds the validated domain type returned by its
//! repository, the camelCase view sent to clients and the input accepted from
//! forms. Inputs validate into plain values before any query runs.

pub mod attendance;
pub mod department;
pub mod expansion;
pub mod group_home;
pub mod resident;
pub mod role;
pub mod session;
pub mod shift_preference;
pub mod usage_record;
pub mod user;

pub use session::{CurrentStaff, SessionStaff, keys as session_keys};

/// Trim a string, mapping blank to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  101 ")), Some("101".to_owned()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
