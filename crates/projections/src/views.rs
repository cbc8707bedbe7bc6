//! Derived views over the projection snapshot.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::snapshot::{year_value, Scenario, BASE_YEAR, SUPPLY_YEARS};
use crate::ProjectionStore;

const HORIZON_YEAR: u16 = 2050;
const REST_OF_WORLD: &str = "Rest of world";

/// One row of the clean-technology demand growth table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    pub mineral: String,
    pub value_2024: f64,
    pub value_2050: f64,
    /// `value_2050 / value_2024`, `None` without a 2024 baseline.
    pub multiplier: Option<f64>,
}

/// Mining supply against total demand for one mineral.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyDemandGap {
    pub mineral: String,
    pub supply: Option<f64>,
    pub demand: Option<f64>,
    /// Surplus when positive, deficit when negative.
    pub gap: Option<f64>,
}

/// A country's footprint across mining supply chains in 2024.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySupply {
    pub country: String,
    pub mineral_count: usize,
    pub total_production: f64,
    pub minerals: Vec<String>,
}

impl ProjectionStore {
    /// 2024 → 2050 clean-technology demand multiplier under `scenario`.
    ///
    /// `None` unless both values are positive.
    pub fn demand_growth(&self, mineral: &str, scenario: Scenario) -> Option<f64> {
        let series = self.cleantech_demand(mineral)?;
        let base = series.base?;
        let horizon = series.value(scenario, HORIZON_YEAR)?;
        (base > 0.0 && horizon > 0.0).then(|| horizon / base)
    }

    /// Growth rows for every cleantech mineral with demand in 2024 or 2050,
    /// largest multiplier first. `Total*` aggregate rows are excluded.
    pub fn growth_table(&self, scenario: Scenario) -> Vec<GrowthRow> {
        let Some(by_mineral) = self.all_cleantech_by_mineral() else {
            return Vec::new();
        };

        let mut rows: Vec<GrowthRow> = by_mineral
            .iter()
            .filter(|(name, _)| !name.starts_with("Total"))
            .map(|(name, series)| {
                let value_2024 = series.base.unwrap_or_default();
                let value_2050 = series.value(scenario, HORIZON_YEAR).unwrap_or_default();
                GrowthRow {
                    mineral: name.clone(),
                    value_2024,
                    value_2050,
                    multiplier: (value_2024 > 0.0).then(|| value_2050 / value_2024),
                }
            })
            .filter(|row| row.value_2024 > 0.0 || row.value_2050 > 0.0)
            .collect();

        rows.sort_by(|a, b| {
            b.multiplier
                .unwrap_or_default()
                .partial_cmp(&a.multiplier.unwrap_or_default())
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    /// Mining supply minus total demand in `year` for minerals present in
    /// both tables. Rows with neither value are dropped.
    pub fn supply_demand_gap(&self, scenario: Scenario, year: u16) -> Vec<SupplyDemandGap> {
        let (Some(supply), Some(demand)) = (self.all_supply(), self.all_demand()) else {
            return Vec::new();
        };

        supply
            .iter()
            .filter_map(|(mineral, entry)| {
                let demand_entry = demand.get(mineral)?;
                let supply_total = entry.mining.total_in(year);
                let demand_total = demand_entry
                    .total_demand
                    .as_ref()
                    .and_then(|s| s.value(scenario, year));
                if supply_total.is_none() && demand_total.is_none() {
                    return None;
                }
                Some(SupplyDemandGap {
                    mineral: mineral.clone(),
                    supply: supply_total,
                    demand: demand_total,
                    gap: supply_total.zip(demand_total).map(|(s, d)| s - d),
                })
            })
            .collect()
    }

    /// Countries ranked by how many minerals they mine in 2024, then by
    /// combined 2024 production. "Rest of world" is not a country.
    pub fn supply_country_dominance(&self, limit: usize) -> Vec<CountrySupply> {
        let Some(supply) = self.all_supply() else {
            return Vec::new();
        };

        let mut by_country: BTreeMap<&str, CountrySupply> = BTreeMap::new();
        for (mineral, entry) in supply {
            for (country, values) in &entry.mining.countries {
                if country == REST_OF_WORLD {
                    continue;
                }
                let produced = year_value(values, BASE_YEAR).unwrap_or_default();
                if produced <= 0.0 {
                    continue;
                }
                let stats = by_country
                    .entry(country.as_str())
                    .or_insert_with(|| CountrySupply {
                        country: country.clone(),
                        mineral_count: 0,
                        total_production: 0.0,
                        minerals: Vec::new(),
                    });
                stats.mineral_count += 1;
                stats.total_production += produced;
                stats.minerals.push(mineral.clone());
            }
        }

        let mut ranked: Vec<CountrySupply> = by_country.into_values().collect();
        ranked.sort_by(|a, b| {
            b.mineral_count.cmp(&a.mineral_count).then_with(|| {
                b.total_production
                    .partial_cmp(&a.total_production)
                    .unwrap_or(Ordering::Equal)
            })
        });
        ranked.truncate(limit);
        ranked
    }

    /// mineral → supply year → top-three mining share.
    pub fn top3_share_matrix(&self) -> BTreeMap<String, BTreeMap<u16, Option<f64>>> {
        let Some(supply) = self.all_supply() else {
            return BTreeMap::new();
        };

        supply
            .iter()
            .map(|(mineral, entry)| {
                let row = SUPPLY_YEARS
                    .iter()
                    .map(|&year| (year, entry.mining.top3_share_in(year)))
                    .collect();
                (mineral.clone(), row)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::loaded_store;
    use common::config::DashboardConfig;

    #[test]
    fn test_demand_growth() {
        let store = loaded_store();

        let steps = store.demand_growth("Lithium", Scenario::Steps).unwrap();
        assert!((steps - 820.0 / 120.0).abs() < 1e-9);
        let nze = store.demand_growth("Lithium", Scenario::Nze).unwrap();
        assert!((nze - 1400.0 / 120.0).abs() < 1e-9);

        assert_eq!(store.demand_growth("Lithium", Scenario::Aps), None);
        assert_eq!(store.demand_growth("Gallium", Scenario::Steps), None, "Zero baseline");
        assert_eq!(store.demand_growth("Tin", Scenario::Steps), None, "Missing 2050");
    }

    #[test]
    fn test_growth_table() {
        let store = loaded_store();
        let rows = store.growth_table(Scenario::Steps);

        let names: Vec<&str> = rows.iter().map(|r| r.mineral.as_str()).collect();
        // Hafnium has no demand either year; Total REE is an aggregate.
        assert_eq!(names, vec!["Lithium", "Cobalt", "Gallium", "Tin"]);
        assert_eq!(rows[1].multiplier, Some(2.0));
        assert_eq!(rows[2].multiplier, None);
        assert_eq!(rows[3].multiplier, Some(0.0));
    }

    #[test]
    fn test_supply_demand_gap() {
        let store = loaded_store();

        let gaps = store.supply_demand_gap(Scenario::Steps, 2030);
        assert_eq!(gaps.len(), 2, "Copper has no demand entry");

        let cobalt = gaps.iter().find(|g| g.mineral == "Cobalt").unwrap();
        assert_eq!(cobalt.gap, Some(-20.0));
        let lithium = gaps.iter().find(|g| g.mineral == "Lithium").unwrap();
        assert_eq!(lithium.gap, Some(50.0));

        let nze = store.supply_demand_gap(Scenario::Nze, 2030);
        let cobalt = nze.iter().find(|g| g.mineral == "Cobalt").unwrap();
        assert_eq!(cobalt.demand, None);
        assert_eq!(cobalt.gap, None);
    }

    #[test]
    fn test_supply_country_dominance() {
        let store = loaded_store();
        let ranked = store.supply_country_dominance(12);

        let names: Vec<&str> = ranked.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(names, vec!["Australia", "Congo", "Chile", "China"]);
        assert_eq!(ranked[0].mineral_count, 2);
        assert_eq!(ranked[0].total_production, 95.0);
        assert!(!names.contains(&"Indonesia"), "Zero production excluded");

        assert_eq!(store.supply_country_dominance(1).len(), 1);
    }

    #[test]
    fn test_top3_share_matrix() {
        let store = loaded_store();
        let matrix = store.top3_share_matrix();

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix["Lithium"][&2030], Some(0.68));
        assert_eq!(matrix["Lithium"][&2040], None);
        assert_eq!(matrix["Cobalt"].len(), SUPPLY_YEARS.len());
    }

    #[test]
    fn test_views_empty_before_load() {
        let store = ProjectionStore::from_config(&DashboardConfig::default().projections);

        assert!(store.growth_table(Scenario::Steps).is_empty());
        assert!(store.supply_demand_gap(Scenario::Steps, 2030).is_empty());
        assert!(store.supply_country_dominance(10).is_empty());
        assert!(store.top3_share_matrix().is_empty());
        assert_eq!(store.demand_growth("Lithium", Scenario::Steps), None);
    }
}
