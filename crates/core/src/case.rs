//! Field-name mapping between database rows (`snake_case`) and the API (`camelCase`).
//!
//! Entity structs get their API casing from serde. These helpers cover the
//! places where field names travel as data: request bodies sent with database
//! column names, and exports written in the database's row shape.

use serde_json::{Map, Value};

/// Convert a `snake_case` identifier to `camelCase`.
///
/// ```
/// use grouphome_core::case::snake_to_camel;
///
/// assert_eq!(snake_to_camel("move_out_date"), "moveOutDate");
/// ```
#[must_use]
pub fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a `camelCase` identifier to `snake_case`.
///
/// ```
/// use grouphome_core::case::camel_to_snake;
///
/// assert_eq!(camel_to_snake("moveOutDate"), "move_out_date");
/// ```
#[must_use]
pub fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn map_keys(value: Value, f: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (f(&k), map_keys(v, f)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_keys(v, f)).collect()),
        other => other,
    }
}

/// Recursively rename every object key to `camelCase`.
#[must_use]
pub fn keys_to_camel(value: Value) -> Value {
    map_keys(value, snake_to_camel)
}

/// Recursively rename every object key to `snake_case`.
#[must_use]
pub fn keys_to_snake(value: Value) -> Value {
    map_keys(value, camel_to_snake)
}

/// Column names of every persisted entity, used to check mapping round-trips.
pub const ENTITY_FIELDS: &[&str] = &[
    "id",
    "name",
    "name_kana",
    "email",
    "role_name",
    "display_name",
    "permissions",
    "is_system",
    "hire_date",
    "retirement_date",
    "status",
    "stored_status",
    "department_id",
    "department_name",
    "start_date",
    "end_date",
    "facility_code",
    "unit_name",
    "postal_code",
    "address",
    "phone_number",
    "room_numbers",
    "common_room",
    "opened_on",
    "group_home_id",
    "expansion_type",
    "room_number",
    "move_in_date",
    "move_out_date",
    "disability_level",
    "resident_id",
    "user_id",
    "target_month",
    "desired_days",
    "entries",
    "notes",
    "usage_date",
    "used",
    "work_date",
    "clock_in",
    "clock_out",
    "break_minutes",
    "created_at",
    "updated_at",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("id"), "id");
        assert_eq!(snake_to_camel("group_home_id"), "groupHomeId");
        assert_eq!(snake_to_camel("_private"), "_private");
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("id"), "id");
        assert_eq!(camel_to_snake("groupHomeId"), "group_home_id");
    }

    #[test]
    fn test_entity_fields_roundtrip() {
        for field in ENTITY_FIELDS {
            assert_eq!(camel_to_snake(&snake_to_camel(field)), *field);
        }
    }

    #[test]
    fn test_keys_mapped_recursively() {
        let row = json!({
            "resident_id": 3,
            "disability_histories": [
                { "start_date": "2024-01-01", "end_date": null, "disability_level": "4" }
            ],
            "notes": "夜間見守りあり"
        });
        let camel = keys_to_camel(row.clone());
        assert_eq!(camel["residentId"], 3);
        assert_eq!(camel["disabilityHistories"][0]["disabilityLevel"], "4");
        assert_eq!(camel["notes"], "夜間見守りあり");
        assert_eq!(keys_to_snake(camel), row);
    }
}
