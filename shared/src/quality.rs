use std::fmt;

use serde::{Deserialize, Serialize};

/// Road condition of a grid cell or route segment.
///
/// The service mixes display names (`"Very Poor"`) with classifier names
/// (`"very_poor"`), so parsing is lenient and anything unrecognised becomes
/// [`QualityLabel::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum QualityLabel {
    Good,
    Satisfactory,
    Poor,
    VeryPoor,
    Unknown,
}

impl QualityLabel {
    pub const KNOWN: [QualityLabel; 4] = [
        QualityLabel::Good,
        QualityLabel::Satisfactory,
        QualityLabel::Poor,
        QualityLabel::VeryPoor,
    ];

    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "good" => Self::Good,
            "satisfactory" => Self::Satisfactory,
            "poor" => Self::Poor,
            "verypoor" => Self::VeryPoor,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for QualityLabel {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for QualityLabel {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<QualityLabel> for &'static str {
    fn from(label: QualityLabel) -> Self {
        label.as_str()
    }
}
