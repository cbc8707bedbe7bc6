//! Mineral catalogue: display names, raw commodity strings, and the
//! reverse mapping used when indexing source rows.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::MineralConfig;

/// Key of the composite "all minerals" overview.
pub const ALL_MINERALS_KEY: &str = "All Minerals \u{2014} Overview";

/// Read-only view over the configured minerals.
#[derive(Debug, Clone, Default)]
pub struct MineralCatalogue {
    minerals: BTreeMap<String, MineralConfig>,
    by_commodity: BTreeMap<String, Vec<String>>,
    commodities: Vec<String>,
}

impl MineralCatalogue {
    pub fn from_config(minerals: &BTreeMap<String, MineralConfig>) -> Self {
        let mut by_commodity: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut commodities = Vec::new();
        let mut seen = BTreeSet::new();

        // BTreeMap iteration is sorted, so both the reverse mapping and the
        // fetch list come out in display-name order.
        for (name, cfg) in minerals {
            if cfg.no_data {
                continue;
            }
            let Some(commodity) = cfg.commodity.as_deref() else {
                continue;
            };
            by_commodity
                .entry(commodity.to_string())
                .or_default()
                .push(name.clone());
            if seen.insert(commodity.to_string()) {
                commodities.push(commodity.to_string());
            }
        }

        Self {
            minerals: minerals.clone(),
            by_commodity,
            commodities,
        }
    }

    /// All display names, sorted.
    pub fn mineral_names(&self) -> impl Iterator<Item = &str> {
        self.minerals.keys().map(String::as_str)
    }

    /// Display names that have a data source, sorted.
    pub fn active_minerals(&self) -> impl Iterator<Item = &str> {
        self.minerals
            .iter()
            .filter(|(_, cfg)| !cfg.no_data && cfg.commodity.is_some())
            .map(|(name, _)| name.as_str())
    }

    /// Distinct raw commodity strings; each is fetched exactly once.
    pub fn unique_commodities(&self) -> &[String] {
        &self.commodities
    }

    /// Minerals backed by a raw commodity string. Empty when unknown.
    pub fn minerals_for_commodity(&self, commodity: &str) -> &[String] {
        self.by_commodity
            .get(commodity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, mineral: &str) -> Option<&MineralConfig> {
        self.minerals.get(mineral)
    }

    /// True for minerals that must never reach the cache: flagged no-data,
    /// without a commodity, or the overview key.
    pub fn is_no_data(&self, mineral: &str) -> bool {
        if mineral == ALL_MINERALS_KEY {
            return true;
        }
        self.minerals
            .get(mineral)
            .map(|cfg| cfg.no_data || cfg.commodity.is_none())
            .unwrap_or(false)
    }

    /// Configured unit for a mineral.
    pub fn unit(&self, mineral: &str) -> Option<&str> {
        self.minerals.get(mineral).map(|cfg| cfg.unit.as_str())
    }

    pub fn len(&self) -> usize {
        self.minerals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minerals.is_empty()
    }
}
