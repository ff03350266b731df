//! Disability support level (障害支援区分).

use serde::{Deserialize, Serialize};

/// Graded disability support classification.
///
/// Level 1 and "not applicable" are grouped together as `1以下`, which is
/// also the wire and database representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DisabilityLevel {
    #[serde(rename = "1以下")]
    OneOrBelow,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
}

impl DisabilityLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 6] = [
        Self::OneOrBelow,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneOrBelow => "1以下",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
        }
    }
}

impl std::fmt::Display for DisabilityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DisabilityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1以下" | "1" | "区分1以下" => Ok(Self::OneOrBelow),
            "2" | "区分2" => Ok(Self::Two),
            "3" | "区分3" => Ok(Self::Three),
            "4" | "区分4" => Ok(Self::Four),
            "5" | "区分5" => Ok(Self::Five),
            "6" | "区分6" => Ok(Self::Six),
            other => Err(format!("invalid disability level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_agree() {
        for level in DisabilityLevel::ALL {
            assert_eq!(level.as_str().parse::<DisabilityLevel>(), Ok(level));
        }
        assert_eq!("区分4".parse::<DisabilityLevel>(), Ok(DisabilityLevel::Four));
        assert!("7".parse::<DisabilityLevel>().is_err());
    }

    #[test]
    fn test_serde_uses_display_form() {
        let json = serde_json::to_string(&DisabilityLevel::OneOrBelow).ok();
        assert_eq!(json.as_deref(), Some("\"1以下\""));
        let level: Option<DisabilityLevel> = serde_json::from_str("\"6\"").ok();
        assert_eq!(level, Some(DisabilityLevel::Six));
    }

    #[test]
    fn test_ordering_follows_support_need() {
        assert!(DisabilityLevel::OneOrBelow < DisabilityLevel::Six);
    }
}
