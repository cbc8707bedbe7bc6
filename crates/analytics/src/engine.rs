//! Analytics engine.
//!
//! Derives producer rankings, world totals, market shares, concentration
//! and the cross-mineral dominance leaderboard from a `DataCache`. Never
//! mutates the cache. Minerals without a data source (and the overview key)
//! short-circuit to empty results before any cache lookup.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use common::config::{AnalyticsConfig, YearRange};
use mineral_cache::DataCache;
use serde::Serialize;
use tracing::debug;

use crate::concentration::{herfindahl_index, Concentration, ConcentrationBand};
use crate::dominance::DominanceEntry;

/// One row of a top-N ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProducerEntry {
    /// 1-based.
    pub rank: usize,
    pub entity_code: String,
    pub entity_name: String,
    pub quantity: f64,
    pub unit: String,
}

/// A producer's share of the world total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShare {
    pub entity_code: String,
    pub entity_name: String,
    pub quantity: f64,
    /// Percent of world total, 0-100.
    pub share_pct: f64,
}

/// The analytics engine.
pub struct AnalyticsEngine {
    pub config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Producers with a positive quantity, largest first, at most `n`.
    ///
    /// Ties keep entity-code order (the sort is stable over the
    /// entity-ordered index).
    pub fn top_producers(
        &self,
        cache: &DataCache,
        mineral: &str,
        year: i32,
        n: usize,
    ) -> Vec<ProducerEntry> {
        if cache.catalogue().is_no_data(mineral) {
            return Vec::new();
        }

        let mut producing: Vec<_> = cache
            .mineral_year_records(mineral, year)
            .filter(|rec| rec.is_producing())
            .collect();
        producing.sort_by(|a, b| by_quantity_desc(a.quantity, b.quantity));

        producing
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, rec)| ProducerEntry {
                rank: i + 1,
                entity_code: rec.entity_code.clone(),
                entity_name: display_name(cache, &rec.entity_code, rec.display_name()),
                quantity: rec.quantity.unwrap_or_default(),
                unit: rec.unit.clone(),
            })
            .collect()
    }

    /// Sum of reported quantities. `None` for minerals without data.
    pub fn world_total(&self, cache: &DataCache, mineral: &str, year: i32) -> Option<f64> {
        if cache.catalogue().is_no_data(mineral) {
            return None;
        }
        Some(cache.world_total(mineral, year))
    }

    /// Share of world total for every producing entity, largest first.
    pub fn market_shares(&self, cache: &DataCache, mineral: &str, year: i32) -> Vec<MarketShare> {
        let total = match self.world_total(cache, mineral, year) {
            Some(t) if t > 0.0 => t,
            _ => return Vec::new(),
        };

        self.top_producers(cache, mineral, year, usize::MAX)
            .into_iter()
            .map(|p| MarketShare {
                share_pct: p.quantity / total * 100.0,
                entity_code: p.entity_code,
                entity_name: p.entity_name,
                quantity: p.quantity,
            })
            .collect()
    }

    /// Herfindahl-Hirschman index for one mineral and year.
    pub fn concentration(&self, cache: &DataCache, mineral: &str, year: i32) -> Concentration {
        let Some(total) = self.world_total(cache, mineral, year) else {
            return Concentration::Undefined;
        };

        let quantities = cache
            .mineral_year_records(mineral, year)
            .filter_map(|rec| rec.quantity);

        match herfindahl_index(quantities, total) {
            Some(value) => Concentration::Index {
                value,
                band: ConcentrationBand::classify(value, &self.config),
            },
            None => Concentration::Undefined,
        }
    }

    /// Concentration for every year in `years`.
    pub fn concentration_series(
        &self,
        cache: &DataCache,
        mineral: &str,
        years: YearRange,
    ) -> BTreeMap<i32, Concentration> {
        years
            .years()
            .map(|year| (year, self.concentration(cache, mineral, year)))
            .collect()
    }

    /// Rank-based dominance scores for `year`, keyed by entity code.
    ///
    /// Each active mineral awards `depth + 1 - rank` points to its top
    /// `depth` producers. Quantities are never summed across minerals, so
    /// units do not matter.
    pub fn dominance_scores(&self, cache: &DataCache, year: i32) -> BTreeMap<String, DominanceEntry> {
        let depth = self.config.dominance_depth;
        let mut scores: BTreeMap<String, DominanceEntry> = BTreeMap::new();

        for mineral in cache.catalogue().active_minerals() {
            let top = self.top_producers(cache, mineral, year, depth);
            if top.is_empty() {
                debug!("{}: no producers in {}", mineral, year);
                continue;
            }
            for producer in top {
                scores
                    .entry(producer.entity_code.clone())
                    .or_insert_with(|| DominanceEntry::new(&producer.entity_code, &producer.entity_name))
                    .award(mineral, producer.rank, depth);
            }
        }

        scores
    }

    /// Dominance entries in leaderboard order, at most `limit`.
    pub fn dominance_leaderboard(
        &self,
        cache: &DataCache,
        year: i32,
        limit: usize,
    ) -> Vec<DominanceEntry> {
        let mut entries: Vec<DominanceEntry> = self.dominance_scores(cache, year).into_values().collect();
        entries.sort_by(DominanceEntry::leaderboard_cmp);
        entries.truncate(limit);
        entries
    }
}

/// Descending by quantity; quantities here are always present and positive.
fn by_quantity_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.unwrap_or_default()
        .partial_cmp(&a.unwrap_or_default())
        .unwrap_or(Ordering::Equal)
}

/// Cache-wide first-seen name, else the record's own.
fn display_name(cache: &DataCache, entity_code: &str, fallback: &str) -> String {
    cache.entity_name(entity_code).unwrap_or(fallback).to_string()
}
