//! Projection dataset accessor.
//!
//! Holds one immutable demand/supply outlook snapshot, loaded atomically
//! from a file, a URL, or a string. Every accessor returns `None` or an
//! empty result before the snapshot is loaded or when a key is missing;
//! only loading can fail.

pub mod snapshot;
pub mod views;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use common::config::{ProjectionKeys, ProjectionsConfig};
use common::Error;
use tracing::{debug, info};

pub use snapshot::{
    CleantechByTech, DemandEntry, ProjectionSnapshot, Scenario, ScenarioSeries, SupplyEntry,
    SupplySide, TechBreakdown, YearValues, BASE_YEAR, MILESTONE_YEARS, SUPPLY_YEARS,
};
pub use views::{CountrySupply, GrowthRow, SupplyDemandGap};

/// Attribution used when the snapshot does not name its source.
pub const DEFAULT_SOURCE: &str = "IEA Critical Minerals Data Explorer";

/// Load-once store for the projection snapshot.
#[derive(Debug, Default)]
pub struct ProjectionStore {
    snapshot: OnceLock<ProjectionSnapshot>,
    mapping: BTreeMap<String, ProjectionKeys>,
}

impl ProjectionStore {
    /// Empty store. `mapping` links dashboard mineral names to snapshot keys.
    pub fn new(mapping: BTreeMap<String, ProjectionKeys>) -> Self {
        Self {
            snapshot: OnceLock::new(),
            mapping,
        }
    }

    pub fn from_config(cfg: &ProjectionsConfig) -> Self {
        Self::new(cfg.mapping.clone())
    }

    // ── Loading ───────────────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.snapshot.get().is_some()
    }

    /// Install an already-parsed snapshot. Fails if one is loaded.
    pub fn install(&self, snapshot: ProjectionSnapshot) -> Result<(), Error> {
        let counts = (
            snapshot.total_demand.len(),
            snapshot.supply.len(),
            snapshot.cleantech_by_mineral.len(),
            snapshot.by_technology.len(),
        );
        self.snapshot
            .set(snapshot)
            .map_err(|_| Error::Projections("snapshot already loaded".into()))?;

        info!(
            "Projection data loaded: {} demand, {} supply, {} cleantech minerals, {} technologies",
            counts.0, counts.1, counts.2, counts.3
        );
        Ok(())
    }

    pub fn load_from_str(&self, json: &str) -> Result<(), Error> {
        let snapshot: ProjectionSnapshot = serde_json::from_str(json)?;
        self.install(snapshot)
    }

    pub async fn load_from_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        debug!("Reading projection data from {}", path.display());
        let json = tokio::fs::read_to_string(path).await?;
        self.load_from_str(&json)
    }

    pub async fn load_from_url(&self, url: &str) -> Result<(), Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Projections(format!("failed to build HTTP client: {e}")))?;

        debug!("Fetching projection data: {}", url);

        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Projections(format!("fetch failed for {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Projections(format!(
                "fetch failed: {}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Projections(format!("failed to read body from {url}: {e}")))?;
        self.load_from_str(&body)
    }

    /// Load from the configured path, else the configured URL.
    pub async fn load(&self, cfg: &ProjectionsConfig) -> Result<(), Error> {
        match (&cfg.path, &cfg.url) {
            (Some(path), _) => self.load_from_path(path).await,
            (None, Some(url)) => self.load_from_url(url).await,
            (None, None) => Err(Error::Config("no projection data path or url configured".into())),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Option<&ProjectionSnapshot> {
        self.snapshot.get()
    }

    pub fn keys(&self, mineral: &str) -> Option<&ProjectionKeys> {
        self.mapping.get(mineral)
    }

    /// Total demand by sector for a dashboard mineral.
    pub fn demand(&self, mineral: &str) -> Option<&DemandEntry> {
        let key = self.keys(mineral)?.demand.as_deref()?;
        self.snapshot()?.total_demand.get(key)
    }

    /// Mining and refining supply for a dashboard mineral.
    pub fn supply(&self, mineral: &str) -> Option<&SupplyEntry> {
        let key = self.keys(mineral)?.supply.as_deref()?;
        self.snapshot()?.supply.get(key)
    }

    /// Clean-technology demand for a dashboard mineral.
    pub fn cleantech_demand(&self, mineral: &str) -> Option<&ScenarioSeries> {
        let key = self.keys(mineral)?.cleantech.as_deref()?;
        self.snapshot()?.cleantech_by_mineral.get(key)
    }

    /// Clean-technology demand split by technology. Falls back to the
    /// demand key when no cleantech key is mapped.
    pub fn cleantech_by_tech(&self, mineral: &str) -> Option<&CleantechByTech> {
        let keys = self.keys(mineral)?;
        let key = keys.cleantech.as_deref().or(keys.demand.as_deref())?;
        self.snapshot()?.cleantech_by_tech.get(key)
    }

    pub fn tech_breakdown(&self, technology: &str) -> Option<&TechBreakdown> {
        self.snapshot()?.by_technology.get(technology)
    }

    /// Minerals of the cleantech-by-mineral table.
    pub fn mineral_list(&self) -> Vec<&str> {
        self.snapshot()
            .map(|s| s.cleantech_by_mineral.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn tech_list(&self) -> Vec<&str> {
        self.snapshot()
            .map(|s| s.by_technology.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Dashboard minerals that have cleantech demand data.
    pub fn overlap_minerals(&self) -> Vec<&str> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };
        self.mapping
            .iter()
            .filter(|(_, keys)| {
                keys.cleantech
                    .as_ref()
                    .is_some_and(|k| snapshot.cleantech_by_mineral.contains_key(k))
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn all_demand(&self) -> Option<&BTreeMap<String, DemandEntry>> {
        self.snapshot().map(|s| &s.total_demand)
    }

    pub fn all_supply(&self) -> Option<&BTreeMap<String, SupplyEntry>> {
        self.snapshot().map(|s| &s.supply)
    }

    pub fn all_cleantech_by_mineral(&self) -> Option<&BTreeMap<String, ScenarioSeries>> {
        self.snapshot().map(|s| &s.cleantech_by_mineral)
    }

    pub fn all_by_technology(&self) -> Option<&BTreeMap<String, TechBreakdown>> {
        self.snapshot().map(|s| &s.by_technology)
    }

    /// Attribution string, with a default when absent or not loaded.
    pub fn source(&self) -> &str {
        self.snapshot()
            .and_then(|s| s.source.as_deref())
            .unwrap_or(DEFAULT_SOURCE)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use common::config::DashboardConfig;

    pub const SAMPLE: &str = r#"{
        "source": "IEA Critical Minerals Data Explorer (2024), CC BY 4.0",
        "totalDemand": {
            "Lithium": {
                "sectors": {
                    "Electric vehicles": {"2024": 100, "STEPS": {"2030": 300, "2050": 700}},
                    "Grid battery storage": {"2024": 20, "STEPS": {"2030": 60, "2050": 120}}
                },
                "totalClean": {"2024": 120, "STEPS": {"2030": 360, "2050": 820}},
                "totalDemand": {"2024": 200, "STEPS": {"2030": 450, "2040": 800}, "NZE": {"2030": 600}}
            },
            "Cobalt": {
                "totalDemand": {"2024": 220, "STEPS": {"2030": 300, "2040": 360}}
            }
        },
        "supply": {
            "Lithium": {
                "mining": {
                    "countries": {
                        "Australia": {"2024": 90, "2030": 110},
                        "Chile": {"2024": 40},
                        "China": {"2024": 30},
                        "Rest of world": {"2024": 60}
                    },
                    "total": {"2024": 220, "2030": 500, "2040": 700},
                    "top3Share": {"2024": 0.73, "2030": 0.68}
                },
                "refining": {
                    "countries": {"China": {"2024": 140}},
                    "total": {"2024": 210}
                }
            },
            "Cobalt": {
                "mining": {
                    "countries": {
                        "Australia": {"2024": 5},
                        "Congo": {"2024": 170},
                        "Indonesia": {"2024": 0}
                    },
                    "total": {"2024": 230, "2030": 280},
                    "top3Share": {"2024": 0.85}
                }
            },
            "Copper": {
                "mining": {"total": {"2024": 23000}}
            }
        },
        "cleantechByTech": {
            "Lithium": {
                "sectors": {"Electric vehicles": {"2024": 100}},
                "total": {"2024": 120}
            }
        },
        "cleantechByMineral": {
            "Lithium": {"2024": 120, "STEPS": {"2050": 820}, "NZE": {"2050": 1400}},
            "Cobalt": {"2024": 50, "STEPS": {"2050": 100}},
            "Gallium": {"2024": 0, "STEPS": {"2050": 2}},
            "Hafnium": {"2024": 0, "STEPS": {"2050": 0}},
            "Tin": {"2024": 10, "STEPS": {"2050": null}},
            "Total REE": {"2024": 40, "STEPS": {"2050": 120}}
        },
        "byTechnology": {
            "Solar PV": {"minerals": {"Silicon": {"2024": 500}}},
            "Wind": {"minerals": {"Rare Earth Elements": {"2024": 12}}}
        }
    }"#;

    pub fn loaded_store() -> ProjectionStore {
        let store = ProjectionStore::from_config(&DashboardConfig::default().projections);
        store.load_from_str(SAMPLE).expect("sample should load");
        store
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{loaded_store, SAMPLE};
    use super::*;
    use common::config::DashboardConfig;

    fn empty_store() -> ProjectionStore {
        ProjectionStore::from_config(&DashboardConfig::default().projections)
    }

    #[test]
    fn test_accessors_empty_before_load() {
        let store = empty_store();

        assert!(!store.is_ready());
        assert!(store.demand("Lithium").is_none());
        assert!(store.supply("Lithium").is_none());
        assert!(store.cleantech_demand("Lithium").is_none());
        assert!(store.tech_breakdown("Wind").is_none());
        assert!(store.mineral_list().is_empty());
        assert!(store.overlap_minerals().is_empty());
        assert!(store.all_demand().is_none());
        assert_eq!(store.source(), DEFAULT_SOURCE);
    }

    #[test]
    fn test_demand_and_supply_lookup() {
        let store = loaded_store();

        let demand = store.demand("Lithium").expect("lithium demand");
        assert_eq!(demand.sectors.len(), 2);
        let total = demand.total_demand.as_ref().unwrap();
        assert_eq!(total.value(Scenario::Steps, 2040), Some(800.0));
        assert_eq!(total.value(Scenario::Nze, 2030), Some(600.0));

        let supply = store.supply("Lithium").expect("lithium supply");
        assert_eq!(supply.mining.total_in(2030), Some(500.0));
        assert_eq!(supply.refining.countries["China"]["2024"], Some(140.0));

        assert!(store.supply("Tin").is_none(), "Tin has no supply key");
        assert!(store.demand("Unobtainium").is_none());
    }

    #[test]
    fn test_cleantech_lookups() {
        let store = loaded_store();

        assert_eq!(store.cleantech_demand("Lithium").unwrap().base, Some(120.0));
        assert!(store.cleantech_demand("Vanadium").is_none(), "Key mapped but absent");
        assert!(store.cleantech_by_tech("Lithium").is_some());
        assert_eq!(
            store.tech_breakdown("Solar PV").unwrap().minerals["Silicon"].base,
            Some(500.0)
        );
        assert_eq!(store.tech_list(), vec!["Solar PV", "Wind"]);
        assert_eq!(store.mineral_list().len(), 6);
    }

    #[test]
    fn test_cleantech_by_tech_falls_back_to_demand_key() {
        let mut mapping = BTreeMap::new();
        mapping.insert(
            "Lithium".to_string(),
            ProjectionKeys {
                demand: Some("Lithium".into()),
                ..ProjectionKeys::default()
            },
        );
        let store = ProjectionStore::new(mapping);
        store.load_from_str(SAMPLE).unwrap();

        assert!(store.cleantech_demand("Lithium").is_none());
        assert!(store.cleantech_by_tech("Lithium").is_some());
    }

    #[test]
    fn test_overlap_minerals() {
        let store = loaded_store();
        assert_eq!(
            store.overlap_minerals(),
            vec!["Cobalt", "Gallium", "Lithium", "Tin"]
        );
    }

    #[test]
    fn test_source_attribution() {
        let store = loaded_store();
        assert_eq!(
            store.source(),
            "IEA Critical Minerals Data Explorer (2024), CC BY 4.0"
        );
    }

    #[test]
    fn test_load_is_once() {
        let store = loaded_store();
        let err = store.load_from_str(SAMPLE).expect_err("second load should fail");
        assert!(matches!(err, Error::Projections(_)));
        assert!(store.is_ready());
    }

    #[test]
    fn test_malformed_snapshot_leaves_store_empty() {
        let store = empty_store();
        assert!(store.load_from_str("{ not json").is_err());
        assert!(!store.is_ready());
    }

    #[tokio::test]
    async fn test_load_from_missing_path() {
        let store = empty_store();
        let err = store
            .load_from_path("/nonexistent/projections.json")
            .await
            .expect_err("missing file");
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_load_from_configured_path() {
        let path = std::env::temp_dir().join(format!("projections-{}.json", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();

        let store = empty_store();
        let mut cfg = DashboardConfig::default().projections;
        cfg.path = Some(path.display().to_string());
        store.load(&cfg).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(store.is_ready());
        assert!(store.demand("Lithium").is_some());
    }

    #[tokio::test]
    async fn test_load_without_source_configured() {
        let store = empty_store();
        let cfg = DashboardConfig::default().projections;
        let err = store.load(&cfg).await.expect_err("nothing configured");
        assert!(matches!(err, Error::Config(_)));
    }
}
