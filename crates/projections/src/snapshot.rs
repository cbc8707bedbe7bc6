//! Projection snapshot document.
//!
//! Scenario rows look like
//! `{ "2024": 12.0, "STEPS": { "2030": 20.0, ... }, "APS": {...}, "NZE": {...} }`.
//! Any value may be `null`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use common::Error;
use serde::{Deserialize, Serialize};

/// Observed base year of every scenario row.
pub const BASE_YEAR: u16 = 2024;

/// Projection years within each scenario.
pub const MILESTONE_YEARS: [u16; 5] = [2030, 2035, 2040, 2045, 2050];

/// Columns of the mining/refining supply tables.
pub const SUPPLY_YEARS: [u16; 4] = [2024, 2030, 2035, 2040];

/// year (as a string key) → value.
pub type YearValues = BTreeMap<String, Option<f64>>;

/// Outlook scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "STEPS")]
    Steps,
    #[serde(rename = "APS")]
    Aps,
    #[serde(rename = "NZE")]
    Nze,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Steps, Scenario::Aps, Scenario::Nze];

    /// Key used in the snapshot document.
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Steps => "STEPS",
            Scenario::Aps => "APS",
            Scenario::Nze => "NZE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Steps => "Stated Policies",
            Scenario::Aps => "Announced Pledges",
            Scenario::Nze => "Net Zero Emissions by 2050",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STEPS" => Ok(Scenario::Steps),
            "APS" => Ok(Scenario::Aps),
            "NZE" => Ok(Scenario::Nze),
            other => Err(Error::Config(format!(
                "unknown scenario '{other}' (expected STEPS, APS or NZE)"
            ))),
        }
    }
}

/// Base-year value plus per-scenario projections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSeries {
    #[serde(rename = "2024", default)]
    pub base: Option<f64>,
    #[serde(rename = "STEPS", default)]
    pub steps: YearValues,
    #[serde(rename = "APS", default)]
    pub aps: YearValues,
    #[serde(rename = "NZE", default)]
    pub nze: YearValues,
}

impl ScenarioSeries {
    pub fn projections(&self, scenario: Scenario) -> &YearValues {
        match scenario {
            Scenario::Steps => &self.steps,
            Scenario::Aps => &self.aps,
            Scenario::Nze => &self.nze,
        }
    }

    /// Value for a year under a scenario. The base year is shared by all
    /// scenarios.
    pub fn value(&self, scenario: Scenario, year: u16) -> Option<f64> {
        if year == BASE_YEAR {
            return self.base;
        }
        self.projections(scenario)
            .get(&year.to_string())
            .copied()
            .flatten()
    }
}

/// Total demand for one key mineral, split by clean-energy sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandEntry {
    #[serde(default)]
    pub sectors: BTreeMap<String, ScenarioSeries>,
    #[serde(default)]
    pub total_clean: Option<ScenarioSeries>,
    #[serde(default)]
    pub other_uses: Option<ScenarioSeries>,
    #[serde(default)]
    pub total_demand: Option<ScenarioSeries>,
    #[serde(default)]
    pub clean_share: Option<ScenarioSeries>,
}

/// Mining or refining supply by country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplySide {
    #[serde(default)]
    pub countries: BTreeMap<String, YearValues>,
    #[serde(default)]
    pub total: Option<YearValues>,
    /// Fraction (0-1) held by the three largest suppliers.
    #[serde(default)]
    pub top3_share: Option<YearValues>,
}

impl SupplySide {
    pub fn total_in(&self, year: u16) -> Option<f64> {
        year_value(self.total.as_ref()?, year)
    }

    pub fn top3_share_in(&self, year: u16) -> Option<f64> {
        year_value(self.top3_share.as_ref()?, year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyEntry {
    #[serde(default)]
    pub mining: SupplySide,
    #[serde(default)]
    pub refining: SupplySide,
}

/// Clean-technology demand for one mineral, by technology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleantechByTech {
    #[serde(default)]
    pub sectors: BTreeMap<String, ScenarioSeries>,
    #[serde(default)]
    pub total: Option<ScenarioSeries>,
}

/// Mineral demand of one technology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechBreakdown {
    #[serde(default)]
    pub minerals: BTreeMap<String, ScenarioSeries>,
}

/// The whole projection dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSnapshot {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub total_demand: BTreeMap<String, DemandEntry>,
    #[serde(default)]
    pub supply: BTreeMap<String, SupplyEntry>,
    #[serde(default)]
    pub cleantech_by_tech: BTreeMap<String, CleantechByTech>,
    #[serde(default)]
    pub cleantech_by_mineral: BTreeMap<String, ScenarioSeries>,
    #[serde(default)]
    pub by_technology: BTreeMap<String, TechBreakdown>,
}

pub(crate) fn year_value(values: &YearValues, year: u16) -> Option<f64> {
    values.get(&year.to_string()).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_series_lookup() {
        let row: ScenarioSeries = serde_json::from_str(
            r#"{"2024": 10.0, "STEPS": {"2030": 15.0, "2050": null}, "NZE": {"2050": 60.0}}"#,
        )
        .unwrap();

        assert_eq!(row.value(Scenario::Steps, 2024), Some(10.0));
        assert_eq!(row.value(Scenario::Nze, 2024), Some(10.0));
        assert_eq!(row.value(Scenario::Steps, 2030), Some(15.0));
        assert_eq!(row.value(Scenario::Steps, 2050), None);
        assert_eq!(row.value(Scenario::Nze, 2050), Some(60.0));
        assert!(row.aps.is_empty());
    }

    #[test]
    fn test_scenario_parse() {
        assert_eq!("steps".parse::<Scenario>().unwrap(), Scenario::Steps);
        assert_eq!(" NZE ".parse::<Scenario>().unwrap(), Scenario::Nze);
        assert!("SDS".parse::<Scenario>().is_err());
        assert_eq!(Scenario::Aps.to_string(), "APS");
        assert_eq!(Scenario::Aps.label(), "Announced Pledges");
    }

    #[test]
    fn test_supply_side_lookup() {
        let side: SupplySide = serde_json::from_str(
            r#"{
                "countries": {"Chile": {"2024": 5.0}},
                "total": {"2024": 10.0, "2030": 14.0},
                "top3Share": {"2024": 0.71}
            }"#,
        )
        .unwrap();

        assert_eq!(side.total_in(2030), Some(14.0));
        assert_eq!(side.total_in(2040), None);
        assert_eq!(side.top3_share_in(2024), Some(0.71));
        assert_eq!(SupplySide::default().total_in(2024), None);
    }
}
