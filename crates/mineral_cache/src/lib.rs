//! In-memory indexed cache of mineral production records.
//!
//! Records live once in a slot store; three indexes point into it:
//! - by mineral: mineral → year → entity → slot
//! - by entity:  entity → mineral → year → slot
//! - by year:    year → mineral → entity → slot
//!
//! Because every index holds the same slot id for a (mineral, year, entity)
//! triple, replacing a record updates all three views at once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use common::{LogEntry, MineralCatalogue, RawRecord, Record, DEFAULT_UNIT};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache shared between the ingestion pipeline (writer) and readers.
///
/// Each `index_records` batch runs under a single write guard, which keeps
/// the three-index upsert atomic on a multi-threaded runtime.
pub type SharedCache = Arc<RwLock<DataCache>>;

/// Create a new empty SharedCache.
pub fn new_shared_cache(catalogue: MineralCatalogue) -> SharedCache {
    Arc::new(RwLock::new(DataCache::new(catalogue)))
}

/// Counts reported by one `index_records` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Raw rows that passed validation (one log entry each).
    pub processed: usize,
    /// Raw rows dropped as malformed or unmapped.
    pub skipped: usize,
    /// New (mineral, year, entity) entries.
    pub inserted: usize,
    /// Entries whose null quantity was replaced by a reported one.
    pub replaced: usize,
}

/// Cache-wide counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub record_count: usize,
    pub mineral_count: usize,
    pub entity_count: usize,
    pub year_count: usize,
}

enum Upsert {
    Inserted,
    Replaced,
    Kept,
}

/// Session-scoped record cache. Records are never evicted.
#[derive(Debug, Default)]
pub struct DataCache {
    catalogue: MineralCatalogue,
    slots: Vec<Record>,
    by_mineral: HashMap<String, BTreeMap<i32, BTreeMap<String, usize>>>,
    by_entity: HashMap<String, HashMap<String, BTreeMap<i32, usize>>>,
    by_year: BTreeMap<i32, HashMap<String, BTreeMap<String, usize>>>,
    entity_names: HashMap<String, String>,
    log: Vec<LogEntry>,
}

impl DataCache {
    pub fn new(catalogue: MineralCatalogue) -> Self {
        Self {
            catalogue,
            ..Self::default()
        }
    }

    pub fn catalogue(&self) -> &MineralCatalogue {
        &self.catalogue
    }

    // ── Ingestion ─────────────────────────────────────────────────────

    /// Index a batch of raw rows.
    ///
    /// Rows missing a commodity, entity code, or parseable year are skipped,
    /// as are rows whose commodity maps to no mineral. A valid row is
    /// upserted under every mineral its commodity backs and logged once,
    /// under the first of those minerals.
    pub fn index_records<I>(&mut self, raws: I) -> IndexStats
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut stats = IndexStats::default();

        for raw in raws {
            let year = raw.parsed_year();
            let (Some(commodity), Some(entity_code), Some(year)) = (
                raw.commodity.filter(|c| !c.is_empty()),
                raw.entity_code.filter(|c| !c.is_empty()),
                year,
            ) else {
                stats.skipped += 1;
                continue;
            };

            let minerals = self.catalogue.minerals_for_commodity(&commodity).to_vec();
            let Some(representative) = minerals.first().cloned() else {
                stats.skipped += 1;
                continue;
            };

            let unit = raw
                .unit
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string());

            if let Some(name) = raw.entity_name.as_ref() {
                self.entity_names
                    .entry(entity_code.clone())
                    .or_insert_with(|| name.clone());
            }

            for mineral in minerals {
                let record = Record {
                    mineral,
                    entity_code: entity_code.clone(),
                    entity_name: raw.entity_name.clone(),
                    year,
                    quantity: raw.quantity,
                    unit: unit.clone(),
                };
                match self.upsert(record) {
                    Upsert::Inserted => stats.inserted += 1,
                    Upsert::Replaced => stats.replaced += 1,
                    Upsert::Kept => {}
                }
            }

            self.log.push(LogEntry {
                mineral: representative,
                year,
                entity_code,
                quantity: raw.quantity,
                unit,
            });
            stats.processed += 1;
        }

        debug!(
            "Indexed batch: processed={} skipped={} inserted={} replaced={}",
            stats.processed, stats.skipped, stats.inserted, stats.replaced
        );

        stats
    }

    /// Keep the first record for a key unless it has no quantity and the
    /// incoming one does.
    fn upsert(&mut self, record: Record) -> Upsert {
        let existing = self
            .by_mineral
            .get(&record.mineral)
            .and_then(|years| years.get(&record.year))
            .and_then(|entities| entities.get(&record.entity_code))
            .copied();

        if let Some(slot) = existing {
            let current = &mut self.slots[slot];
            if current.quantity.is_none() && record.quantity.is_some() {
                let entity_name = current.entity_name.take().or(record.entity_name);
                *current = Record {
                    entity_name,
                    ..record
                };
                return Upsert::Replaced;
            }
            return Upsert::Kept;
        }

        let slot = self.slots.len();
        self.by_mineral
            .entry(record.mineral.clone())
            .or_default()
            .entry(record.year)
            .or_default()
            .insert(record.entity_code.clone(), slot);
        self.by_entity
            .entry(record.entity_code.clone())
            .or_default()
            .entry(record.mineral.clone())
            .or_default()
            .insert(record.year, slot);
        self.by_year
            .entry(record.year)
            .or_default()
            .entry(record.mineral.clone())
            .or_default()
            .insert(record.entity_code.clone(), slot);
        self.slots.push(record);

        Upsert::Inserted
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Records for a mineral and year, in entity-code order.
    pub fn mineral_year_records(&self, mineral: &str, year: i32) -> impl Iterator<Item = &Record> {
        self.by_mineral
            .get(mineral)
            .and_then(|years| years.get(&year))
            .into_iter()
            .flat_map(|entities| entities.values())
            .map(|&slot| &self.slots[slot])
    }

    /// entity code → record for a mineral and year. Empty if absent.
    pub fn mineral_year(&self, mineral: &str, year: i32) -> BTreeMap<&str, &Record> {
        self.mineral_year_records(mineral, year)
            .map(|rec| (rec.entity_code.as_str(), rec))
            .collect()
    }

    /// year → record for one entity and mineral.
    pub fn entity_series(&self, entity_code: &str, mineral: &str) -> BTreeMap<i32, &Record> {
        self.by_entity
            .get(entity_code)
            .and_then(|minerals| minerals.get(mineral))
            .map(|years| {
                years
                    .iter()
                    .map(|(&year, &slot)| (year, &self.slots[slot]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// mineral → year → record for one entity.
    pub fn entity_data(&self, entity_code: &str) -> BTreeMap<&str, BTreeMap<i32, &Record>> {
        let Some(minerals) = self.by_entity.get(entity_code) else {
            return BTreeMap::new();
        };
        minerals
            .iter()
            .map(|(mineral, years)| {
                let series = years
                    .iter()
                    .map(|(&year, &slot)| (year, &self.slots[slot]))
                    .collect();
                (mineral.as_str(), series)
            })
            .collect()
    }

    /// mineral → entity → record for one year.
    pub fn year_data(&self, year: i32) -> BTreeMap<&str, BTreeMap<&str, &Record>> {
        let Some(minerals) = self.by_year.get(&year) else {
            return BTreeMap::new();
        };
        minerals
            .iter()
            .map(|(mineral, entities)| {
                let rows = entities
                    .iter()
                    .map(|(code, &slot)| (code.as_str(), &self.slots[slot]))
                    .collect();
                (mineral.as_str(), rows)
            })
            .collect()
    }

    /// Sum of reported quantities; zero when there is no data.
    pub fn world_total(&self, mineral: &str, year: i32) -> f64 {
        self.mineral_year_records(mineral, year)
            .filter_map(|rec| rec.quantity)
            .sum()
    }

    /// Reported quantities for a mineral and year.
    pub fn all_values(&self, mineral: &str, year: i32) -> Vec<f64> {
        self.mineral_year_records(mineral, year)
            .filter_map(|rec| rec.quantity)
            .collect()
    }

    /// First display name seen for an entity.
    pub fn entity_name(&self, entity_code: &str) -> Option<&str> {
        self.entity_names.get(entity_code).map(String::as_str)
    }

    pub fn minerals(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_mineral.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn entities(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.by_entity.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn years(&self) -> Vec<i32> {
        self.by_year.keys().copied().collect()
    }

    /// Append-ordered ingestion log.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn has_data(&self) -> bool {
        !self.log.is_empty()
    }

    /// Counts for the loading summary. `record_count` counts raw rows, so a
    /// commodity backing several minerals is counted once.
    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            record_count: self.log.len(),
            mineral_count: self.by_mineral.len(),
            entity_count: self.by_entity.len(),
            year_count: self.by_year.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::DashboardConfig;

    fn catalogue() -> MineralCatalogue {
        MineralCatalogue::from_config(&DashboardConfig::default().minerals)
    }

    fn raw(commodity: &str, entity: &str, year: i32, quantity: Option<f64>) -> RawRecord {
        RawRecord {
            commodity: Some(commodity.into()),
            entity_code: Some(entity.into()),
            entity_name: Some(format!("{entity} name")),
            year: Some(format!("{year}-01-01T00:00:00")),
            quantity,
            unit: None,
        }
    }

    const LITHIUM: &str = "lithium minerals";
    const TA_NB: &str = "tantalum and niobium minerals";

    #[test]
    fn test_null_then_value_is_replaced() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![raw(LITHIUM, "AUS", 2023, None)]);
        let stats = cache.index_records(vec![raw(LITHIUM, "AUS", 2023, Some(5.0))]);

        assert_eq!(stats.replaced, 1);
        assert_eq!(cache.mineral_year("Lithium", 2023)["AUS"].quantity, Some(5.0));
    }

    #[test]
    fn test_value_then_null_is_kept() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![
            raw(LITHIUM, "AUS", 2023, Some(5.0)),
            raw(LITHIUM, "AUS", 2023, None),
            raw(LITHIUM, "AUS", 2023, Some(9.0)),
        ]);

        assert_eq!(
            cache.mineral_year("Lithium", 2023)["AUS"].quantity,
            Some(5.0),
            "First reported value wins"
        );
    }

    #[test]
    fn test_replacement_visible_in_every_index() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![
            raw(LITHIUM, "AUS", 2023, None),
            raw(LITHIUM, "AUS", 2023, Some(7.0)),
        ]);

        let by_mineral = cache.mineral_year("Lithium", 2023)["AUS"].quantity;
        let by_entity = cache.entity_series("AUS", "Lithium")[&2023].quantity;
        let by_year = cache.year_data(2023)["Lithium"]["AUS"].quantity;

        assert_eq!(by_mineral, Some(7.0));
        assert_eq!(by_entity, Some(7.0));
        assert_eq!(by_year, Some(7.0));
    }

    #[test]
    fn test_world_total_and_values() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![
            raw(LITHIUM, "AUS", 2023, Some(100.0)),
            raw(LITHIUM, "CHL", 2023, Some(50.0)),
            raw(LITHIUM, "ARG", 2023, None),
        ]);

        assert_eq!(cache.world_total("Lithium", 2023), 150.0);
        let summed: f64 = cache
            .mineral_year("Lithium", 2023)
            .values()
            .filter_map(|r| r.quantity)
            .sum();
        assert_eq!(cache.world_total("Lithium", 2023), summed);

        let mut values = cache.all_values("Lithium", 2023);
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![50.0, 100.0]);

        assert_eq!(cache.world_total("Lithium", 2019), 0.0);
        assert_eq!(cache.world_total("Cobalt", 2023), 0.0);
        assert!(cache.mineral_year("Cobalt", 2023).is_empty());
    }

    #[test]
    fn test_shared_commodity_indexed_under_both_minerals() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![raw(TA_NB, "COD", 2022, Some(800.0))]);

        assert_eq!(cache.world_total("Niobium", 2022), 800.0);
        assert_eq!(cache.world_total("Tantalum", 2022), 800.0);
        assert_eq!(cache.entity_data("COD").len(), 2);

        // One raw row, one log entry under the first mapped mineral.
        assert_eq!(cache.log().len(), 1);
        assert_eq!(cache.log()[0].mineral, "Niobium");

        let summary = cache.summary();
        assert_eq!(summary.record_count, 1);
        assert_eq!(summary.mineral_count, 2);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let mut cache = DataCache::new(catalogue());
        let mut no_entity = raw(LITHIUM, "AUS", 2023, Some(1.0));
        no_entity.entity_code = None;
        let mut bad_year = raw(LITHIUM, "AUS", 2023, Some(1.0));
        bad_year.year = Some("unknown".into());
        let mut no_commodity = raw(LITHIUM, "AUS", 2023, Some(1.0));
        no_commodity.commodity = Some(String::new());
        let unmapped = raw("unobtainium", "AUS", 2023, Some(1.0));

        let stats = cache.index_records(vec![no_entity, bad_year, no_commodity, unmapped]);

        assert_eq!(stats.skipped, 4);
        assert_eq!(stats.processed, 0);
        assert!(!cache.has_data());
        assert_eq!(cache.summary(), CacheSummary::default());
    }

    #[test]
    fn test_unit_defaults_to_tonnes() {
        let mut cache = DataCache::new(catalogue());
        let mut kg = raw("platinum group metals, mine", "ZAF", 2021, Some(120.0));
        kg.unit = Some("kilograms".into());
        cache.index_records(vec![raw(LITHIUM, "AUS", 2023, Some(1.0)), kg]);

        assert_eq!(cache.mineral_year("Lithium", 2023)["AUS"].unit, "tonnes");
        assert_eq!(cache.mineral_year("PGMs", 2021)["ZAF"].unit, "kilograms");
    }

    #[test]
    fn test_entity_name_first_write_wins() {
        let mut cache = DataCache::new(catalogue());
        let mut first = raw(LITHIUM, "CHN", 2022, Some(1.0));
        first.entity_name = Some("China".into());
        let mut second = raw("graphite", "CHN", 2022, Some(2.0));
        second.entity_name = Some("China, People's Republic of".into());
        cache.index_records(vec![first, second]);

        assert_eq!(cache.entity_name("CHN"), Some("China"));
        assert_eq!(cache.entity_name("USA"), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut cache = DataCache::new(catalogue());
        cache.index_records(vec![
            raw(LITHIUM, "AUS", 2022, Some(1.0)),
            raw(LITHIUM, "AUS", 2023, Some(2.0)),
            raw("graphite", "CHN", 2023, Some(3.0)),
        ]);

        assert!(cache.has_data());
        assert_eq!(
            cache.summary(),
            CacheSummary {
                record_count: 3,
                mineral_count: 2,
                entity_count: 2,
                year_count: 2,
            }
        );
        assert_eq!(cache.minerals(), vec!["Graphite", "Lithium"]);
        assert_eq!(cache.entities(), vec!["AUS", "CHN"]);
        assert_eq!(cache.years(), vec![2022, 2023]);
        assert_eq!(
            cache.entity_series("AUS", "Lithium").keys().copied().collect::<Vec<_>>(),
            vec![2022, 2023]
        );
    }

    #[tokio::test]
    async fn test_shared_cache_write_then_read() {
        let shared = new_shared_cache(catalogue());
        shared
            .write()
            .await
            .index_records(vec![raw(LITHIUM, "AUS", 2023, Some(4.0))]);

        let cache = shared.read().await;
        assert_eq!(cache.world_total("Lithium", 2023), 4.0);
    }
}
