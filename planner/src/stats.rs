//! Route statistics derived from the road condition list.
//!
//! Poor and Very Poor are merged into one bucket for the percentage breakdown
//! only; the quality score and travel-time multiplier weigh them separately.

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use shared::QualityLabel;

const MIN_MOCK_CONDITIONS: usize = 3;
const MAX_MOCK_CONDITIONS: usize = 10;
const POINTS_PER_MOCK_CONDITION: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionCounts {
    pub good: usize,
    pub satisfactory: usize,
    pub poor: usize,
    pub very_poor: usize,
}

impl ConditionCounts {
    /// Unknown labels carry no weight and are left out of the totals.
    pub fn tally(conditions: &[QualityLabel]) -> Self {
        conditions
            .iter()
            .fold(Self::default(), |mut counts, label| {
                match label {
                    QualityLabel::Good => counts.good += 1,
                    QualityLabel::Satisfactory => counts.satisfactory += 1,
                    QualityLabel::Poor => counts.poor += 1,
                    QualityLabel::VeryPoor => counts.very_poor += 1,
                    QualityLabel::Unknown => {}
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.good + self.satisfactory + self.poor + self.very_poor
    }

    /// Weighted average with Good=100, Satisfactory=70, Poor=40, Very Poor=10.
    pub fn quality_score(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let weighted = self.good * 100 + self.satisfactory * 70 + self.poor * 40 + self.very_poor * 10;
        (weighted as f64 / total as f64).round() as u8
    }

    /// Travel-time penalty: Good=1.0, Satisfactory=1.3, Poor=1.6, Very Poor=2.0.
    pub fn duration_multiplier(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        (self.good as f64 * 1.0
            + self.satisfactory as f64 * 1.3
            + self.poor as f64 * 1.6
            + self.very_poor as f64 * 2.0)
            / total as f64
    }

    pub fn breakdown(&self) -> ConditionBreakdown {
        let total = self.total();
        if total == 0 {
            return ConditionBreakdown::default();
        }
        let percent = |count: usize| (count as f64 / total as f64 * 100.0).round() as u8;
        ConditionBreakdown {
            good: percent(self.good),
            moderate: percent(self.satisfactory),
            poor: percent(self.poor + self.very_poor),
        }
    }
}

/// Integer percentages; their sum is 100 give or take rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionBreakdown {
    pub good: u8,
    pub moderate: u8,
    pub poor: u8,
}

impl ConditionBreakdown {
    pub fn sum(&self) -> u16 {
        u16::from(self.good) + u16::from(self.moderate) + u16::from(self.poor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            81..=u8::MAX => Self::Excellent,
            61..=80 => Self::Good,
            41..=60 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Rounded to one decimal.
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub quality_score: u8,
    pub conditions: ConditionBreakdown,
}

impl RouteSummary {
    pub fn derive(distance_km: f64, base_duration_minutes: f64, conditions: &[QualityLabel]) -> Self {
        let counts = ConditionCounts::tally(conditions);
        let adjusted = (base_duration_minutes.max(0.0) * counts.duration_multiplier()).ceil();
        Self {
            distance_km: (distance_km.max(0.0) * 10.0).round() / 10.0,
            duration_minutes: adjusted as u32,
            quality_score: counts.quality_score(),
            conditions: counts.breakdown(),
        }
    }

    pub fn distance_label(&self) -> String {
        format!("{:.1}", self.distance_km)
    }

    pub fn duration_label(&self) -> String {
        format!("{} min", self.duration_minutes)
    }

    pub fn rating(&self) -> QualityRating {
        QualityRating::from_score(self.quality_score)
    }
}

/// Placeholder conditions for a route that came back without grid data:
/// one label per five points, between 3 and 10 labels.
pub fn mock_conditions<R: Rng>(route_len: usize, rng: &mut R) -> Vec<QualityLabel> {
    let count = (route_len / POINTS_PER_MOCK_CONDITION).clamp(MIN_MOCK_CONDITIONS, MAX_MOCK_CONDITIONS);
    (0..count)
        .filter_map(|_| QualityLabel::KNOWN.choose(rng).copied())
        .collect()
}
