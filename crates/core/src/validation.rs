//! Field-scoped validation errors.
//!
//! Validation failures block a save and are returned to the form keyed by the
//! API (camelCase) field name. Only the first message per field is kept.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Collected field errors for one submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field` unless one is already recorded.
    pub fn add(&mut self, field: impl Into<String>, message: impl fmt::Display) {
        self.0
            .entry(field.into())
            .or_insert_with(|| message.to_string());
    }

    /// Record an error built from a `Result`, returning the success value.
    pub fn check<T, E: fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e);
                None
            }
        }
    }

    /// Require a non-blank string.
    pub fn require(&mut self, field: &str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format_args!("{label}を入力してください"));
        }
    }

    /// Require a string no longer than `max` characters.
    pub fn max_chars(&mut self, field: &str, label: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format_args!("{label}は{max}文字以内で入力してください"));
        }
    }

    /// Require exactly `len` ASCII digits (事業所番号).
    pub fn digits(&mut self, field: &str, label: &str, value: &str, len: usize) {
        let value = value.trim();
        if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
            self.add(field, format_args!("{label}は{len}桁の数字で入力してください"));
        }
    }

    /// Postal code as `123-4567` or `1234567`.
    pub fn postal_code(&mut self, field: &str, value: &str) {
        if !is_postal_code(value.trim()) {
            self.add(field, "郵便番号は「123-4567」の形式で入力してください");
        }
    }

    /// Phone number: digits with optional hyphens, 10 or 11 digits.
    pub fn phone_number(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let digits = value.bytes().filter(u8::is_ascii_digit).count();
        let allowed = value.bytes().all(|b| b.is_ascii_digit() || b == b'-');
        if !allowed || !(10..=11).contains(&digits) || value.starts_with('-') {
            self.add(field, "電話番号は10〜11桁の数字（ハイフン可）で入力してください");
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn is_postal_code(value: &str) -> bool {
    let b = value.as_bytes();
    match b.len() {
        7 => b.iter().all(u8::is_ascii_digit),
        8 => b[3] == b'-' && b[..3].iter().chain(&b[4..]).all(u8::is_ascii_digit),
        _ => false,
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<(&str, String)> for ValidationErrors {
    fn from((field, message): (&str, String)) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.require("name", "氏名", "  ");
        errors.add("name", "別のエラー");
        assert_eq!(errors.get("name"), Some("氏名を入力してください"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.max_chars("notes", "備考", &"あ".repeat(11), 10);
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.get("notes"), Some("備考は10文字以内で入力してください"));
    }

    #[test]
    fn test_formats() {
        let mut errors = ValidationErrors::new();
        errors.digits("facilityCode", "事業所番号", "1234567890", 10);
        errors.postal_code("postalCode", "150-0001");
        errors.postal_code("postalCode", "1500001");
        errors.phone_number("phoneNumber", "03-1234-5678");
        errors.phone_number("phoneNumber", "09012345678");
        assert!(errors.is_empty());

        errors.digits("facilityCode", "事業所番号", "12345ABCDE", 10);
        errors.postal_code("postalCode", "15-00001");
        errors.phone_number("phoneNumber", "03-1234");
        assert_eq!(
            errors.get("facilityCode"),
            Some("事業所番号は10桁の数字で入力してください")
        );
        assert!(errors.get("postalCode").is_some());
        assert!(errors.get("phoneNumber").is_some());
    }

    #[test]
    fn test_check_returns_value() {
        let mut errors = ValidationErrors::new();
        let ok: Option<i32> = errors.check("a", Ok::<_, String>(1));
        let bad: Option<i32> = errors.check("b", Err::<i32, _>("不正です"));
        assert_eq!(ok, Some(1));
        assert_eq!(bad, None);
        assert_eq!(errors.get("b"), Some("不正です"));
        assert_eq!(errors.to_string(), "b: 不正です");
    }
}
