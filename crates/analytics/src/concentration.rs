//! Herfindahl-Hirschman market concentration.

use common::config::AnalyticsConfig;
use serde::Serialize;

/// Concentration band, inclusive at each lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationBand {
    HighlyConcentrated,
    ModeratelyConcentrated,
    Competitive,
}

impl ConcentrationBand {
    pub fn classify(index: u32, config: &AnalyticsConfig) -> Self {
        if index >= config.highly_concentrated {
            Self::HighlyConcentrated
        } else if index >= config.moderately_concentrated {
            Self::ModeratelyConcentrated
        } else {
            Self::Competitive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyConcentrated => "Highly concentrated",
            Self::ModeratelyConcentrated => "Moderately concentrated",
            Self::Competitive => "Competitive",
        }
    }
}

/// Concentration of one mineral in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Concentration {
    /// No positive world total to divide by.
    Undefined,
    Index { value: u32, band: ConcentrationBand },
}

impl Concentration {
    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Undefined => None,
            Self::Index { value, .. } => Some(*value),
        }
    }

    pub fn band(&self) -> Option<ConcentrationBand> {
        match self {
            Self::Undefined => None,
            Self::Index { band, .. } => Some(*band),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Index { .. })
    }
}

/// `round(10000 × Σ (qᵢ / total)²)` over positive quantities.
///
/// Returns `None` unless `total` is finite and positive.
pub fn herfindahl_index<I>(quantities: I, total: f64) -> Option<u32>
where
    I: IntoIterator<Item = f64>,
{
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    let sum: f64 = quantities
        .into_iter()
        .filter(|q| *q > 0.0)
        .map(|q| {
            let share = q / total;
            share * share
        })
        .sum();
    Some((sum * 10_000.0).round() as u32)
}
