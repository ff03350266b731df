//! Group home (facility) domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::GroupHomeId;
use grouphome_core::rooms::check_room_list;
use grouphome_core::validation::ValidationErrors;

use super::non_blank;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHome {
    pub id: GroupHomeId,
    /// 10-digit facility number (事業所番号).
    pub facility_code: String,
    pub name: String,
    pub unit_name: Option<String>,
    pub postal_code: Option<String>,
    pub address: String,
    pub phone_number: Option<String>,
    /// Rooms the home opened with. Expansions add to these.
    pub room_numbers: Vec<String>,
    pub opened_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHomeInput {
    #[serde(default)]
    pub facility_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub room_numbers: Vec<String>,
    #[serde(default)]
    pub opened_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroupHome {
    pub facility_code: String,
    pub name: String,
    pub unit_name: Option<String>,
    pub postal_code: Option<String>,
    pub address: String,
    pub phone_number: Option<String>,
    pub room_numbers: Vec<String>,
    pub opened_on: Option<NaiveDate>,
}

impl GroupHomeInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate(&self) -> Result<NewGroupHome, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let postal_code = non_blank(self.postal_code.as_deref());
        let phone_number = non_blank(self.phone_number.as_deref());

        errors.require("facilityCode", "事業所番号", &self.facility_code);
        errors.digits("facilityCode", "事業所番号", &self.facility_code, 10);
        errors.require("name", "施設名", &self.name);
        errors.max_chars("name", "施設名", self.name.trim(), 100);
        errors.require("address", "住所", &self.address);
        errors.max_chars("address", "住所", self.address.trim(), 255);
        if let Some(postal) = &postal_code {
            errors.postal_code("postalCode", postal);
        }
        if let Some(phone) = &phone_number {
            errors.phone_number("phoneNumber", phone);
        }
        check_room_list(&mut errors, "roomNumbers", &self.room_numbers);

        errors.into_result().map(|()| NewGroupHome {
            facility_code: self.facility_code.trim().to_owned(),
            name: self.name.trim().to_owned(),
            unit_name: non_blank(self.unit_name.as_deref()),
            postal_code,
            address: self.address.trim().to_owned(),
            phone_number,
            room_numbers: self.room_numbers.iter().map(|r| r.trim().to_owned()).collect(),
            opened_on: self.opened_on,
        })
    }
}

/// Rooms of a home on a date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRoster {
    pub group_home_id: GroupHomeId,
    pub date: NaiveDate,
    pub rooms: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterQuery {
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> GroupHomeInput {
        GroupHomeInput {
            facility_code: "1312345678".to_owned(),
            name: "グループホームさくら".to_owned(),
            unit_name: Some("1階ユニット".to_owned()),
            postal_code: Some("150-0001".to_owned()),
            address: "東京都渋谷区神宮前1-1-1".to_owned(),
            phone_number: Some(" ".to_owned()),
            room_numbers: vec!["101".to_owned(), " 102 ".to_owned()],
            opened_on: None,
        }
    }

    #[test]
    fn test_valid_home() {
        let home = input().validate().unwrap();
        assert_eq!(home.phone_number, None);
        assert_eq!(home.room_numbers, vec!["101", "102"]);
    }

    #[test]
    fn test_invalid_home() {
        let form = GroupHomeInput {
            facility_code: "12345".to_owned(),
            address: String::new(),
            room_numbers: vec!["101".to_owned(), "101".to_owned()],
            ..input()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("facilityCode").is_some());
        assert!(errors.get("address").is_some());
        assert!(errors.get("roomNumbers").is_some());
        assert!(errors.get("name").is_none());
    }
}
