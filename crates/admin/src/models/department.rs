//! Department domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grouphome_core::DepartmentId;
use grouphome_core::validation::ValidationErrors;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    #[serde(default)]
    pub name: String,
}

impl DepartmentInput {
    /// Validate and return the trimmed name.
    ///
    /// # Errors
    ///
    /// Returns field errors when the name is blank or too long.
    pub fn validate(&self) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "部署名", &self.name);
        errors.max_chars("name", "部署名", self.name.trim(), 100);
        errors.into_result().map(|()| self.name.trim().to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let input = DepartmentInput {
            name: " ".to_owned(),
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("部署名を入力してください"));
    }

    #[test]
    fn test_name_trimmed() {
        let input = DepartmentInput {
            name: " 世話人 ".to_owned(),
        };
        assert_eq!(input.validate().unwrap(), "世話人");
    }
}
