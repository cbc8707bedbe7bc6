//! Dashboard configuration types.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Remote statistics API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Ingestion throttling and retry settings.
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Inclusive year window fetched for every commodity.
    #[serde(default)]
    pub years: YearRange,

    /// Ranking and concentration parameters.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Mineral catalogue keyed by display name.
    #[serde(default = "default_minerals")]
    pub minerals: BTreeMap<String, MineralConfig>,

    /// Projection dataset location and key mapping.
    #[serde(default)]
    pub projections: ProjectionsConfig,
}

/// Remote statistics source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Items endpoint of the world mineral statistics collection.
    #[serde(default = "default_api_base")]
    pub base_url: String,

    /// Statistic type filter (e.g. "Production", "Imports").
    #[serde(default = "default_statistic_type")]
    pub statistic_type: String,

    /// Records requested per page.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Throttling and retry parameters for one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum commodity fetches in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Additional attempts after the first failed page request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry n is `retry_base_delay_ms * 2^n`.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

/// Inclusive year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    #[serde(default = "default_year_min")]
    pub min: i32,
    #[serde(default = "default_year_max")]
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }
}

/// Ranking depth and concentration band thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// How many producers per mineral earn dominance points.
    #[serde(default = "default_dominance_depth")]
    pub dominance_depth: usize,

    /// Index at or above which a market is highly concentrated.
    #[serde(default = "default_highly_concentrated")]
    pub highly_concentrated: u32,

    /// Index at or above which a market is moderately concentrated.
    #[serde(default = "default_moderately_concentrated")]
    pub moderately_concentrated: u32,
}

/// One mineral in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineralConfig {
    /// Raw source commodity string. `None` for minerals without a source.
    #[serde(default)]
    pub commodity: Option<String>,

    #[serde(default = "default_unit")]
    pub unit: String,

    /// Another mineral reported under the same raw commodity.
    #[serde(default)]
    pub shared_with: Option<String>,

    /// Listed for completeness but never fetched or scored.
    #[serde(default)]
    pub no_data: bool,
}

impl MineralConfig {
    pub fn new(commodity: &str, unit: &str) -> Self {
        Self {
            commodity: Some(commodity.to_string()),
            unit: unit.to_string(),
            shared_with: None,
            no_data: false,
        }
    }

    pub fn shared(commodity: &str, unit: &str, shared_with: &str) -> Self {
        Self {
            shared_with: Some(shared_with.to_string()),
            ..Self::new(commodity, unit)
        }
    }

    pub fn without_data(unit: &str) -> Self {
        Self {
            commodity: None,
            unit: unit.to_string(),
            shared_with: None,
            no_data: true,
        }
    }
}

/// Where the projection snapshot lives and how minerals map onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionsConfig {
    /// Local JSON snapshot. Takes precedence over `url`.
    #[serde(default)]
    pub path: Option<String>,

    /// Remote JSON snapshot.
    #[serde(default)]
    pub url: Option<String>,

    /// Display mineral name → projection dataset keys.
    #[serde(default = "default_projection_keys")]
    pub mapping: BTreeMap<String, ProjectionKeys>,
}

/// Keys of one mineral in each projection table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionKeys {
    #[serde(default)]
    pub demand: Option<String>,
    #[serde(default)]
    pub supply: Option<String>,
    #[serde(default)]
    pub cleantech: Option<String>,
}

impl ProjectionKeys {
    fn all(key: &str) -> Self {
        Self {
            demand: Some(key.to_string()),
            supply: Some(key.to_string()),
            cleantech: Some(key.to_string()),
        }
    }

    fn cleantech_only(key: &str) -> Self {
        Self {
            cleantech: Some(key.to_string()),
            ..Self::default()
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_api_base() -> String {
    "https://ogcapi.bgs.ac.uk/collections/world-mineral-statistics/items".into()
}
fn default_statistic_type() -> String {
    "Production".into()
}
fn default_page_limit() -> usize {
    5000
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "minerals-dashboard/0.1".into()
}

fn default_max_concurrent() -> usize {
    6
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay() -> u64 {
    1000
}

fn default_year_min() -> i32 {
    2014
}
fn default_year_max() -> i32 {
    2023
}

fn default_dominance_depth() -> usize {
    20
}
fn default_highly_concentrated() -> u32 {
    2500
}
fn default_moderately_concentrated() -> u32 {
    1500
}

fn default_unit() -> String {
    "tonnes".into()
}

fn default_minerals() -> BTreeMap<String, MineralConfig> {
    let tantalum_niobium = "tantalum and niobium minerals";
    [
        ("Antimony", MineralConfig::new("antimony, mine", "tonnes")),
        ("Bismuth", MineralConfig::new("bismuth, mine", "tonnes")),
        ("Cobalt", MineralConfig::new("cobalt, refined", "tonnes")),
        ("Gallium", MineralConfig::new("gallium, primary", "tonnes")),
        ("Germanium", MineralConfig::new("germanium metal", "tonnes")),
        ("Graphite", MineralConfig::new("graphite", "tonnes")),
        ("Indium", MineralConfig::new("indium, refinery", "tonnes")),
        ("Lithium", MineralConfig::new("lithium minerals", "tonnes")),
        ("Magnesium", MineralConfig::new("magnesium metal, primary", "tonnes")),
        ("Manganese", MineralConfig::new("manganese ore", "tonnes")),
        ("Nickel", MineralConfig::new("nickel, mine", "tonnes")),
        ("Niobium", MineralConfig::shared(tantalum_niobium, "tonnes", "Tantalum")),
        ("PGMs", MineralConfig::new("platinum group metals, mine", "kg")),
        ("Rare Earths", MineralConfig::new("rare earth oxides", "tonnes")),
        ("Silicon", MineralConfig::without_data("tonnes")),
        ("Tantalum", MineralConfig::shared(tantalum_niobium, "tonnes", "Niobium")),
        ("Tellurium", MineralConfig::new("tellurium, refined", "tonnes")),
        ("Tin", MineralConfig::new("tin, smelter", "tonnes")),
        ("Titanium", MineralConfig::new("titanium minerals", "tonnes")),
        ("Tungsten", MineralConfig::new("tungsten, mine", "tonnes")),
        ("Vanadium", MineralConfig::new("vanadium, mine", "tonnes")),
    ]
    .into_iter()
    .map(|(name, cfg)| (name.to_string(), cfg))
    .collect()
}

fn default_projection_keys() -> BTreeMap<String, ProjectionKeys> {
    let mut mapping = BTreeMap::new();
    for key in ["Cobalt", "Lithium", "Nickel", "Graphite"] {
        mapping.insert(key.to_string(), ProjectionKeys::all(key));
    }
    mapping.insert(
        "Rare Earths".to_string(),
        ProjectionKeys::all("Rare Earth Elements"),
    );
    for key in [
        "Gallium",
        "Germanium",
        "Indium",
        "Manganese",
        "Niobium",
        "PGMs",
        "Silicon",
        "Tantalum",
        "Tellurium",
        "Tin",
        "Titanium",
        "Tungsten",
        "Vanadium",
    ] {
        mapping.insert(key.to_string(), ProjectionKeys::cleantech_only(key));
    }
    mapping
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            statistic_type: default_statistic_type(),
            page_limit: default_page_limit(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: default_year_min(),
            max: default_year_max(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            dominance_depth: default_dominance_depth(),
            highly_concentrated: default_highly_concentrated(),
            moderately_concentrated: default_moderately_concentrated(),
        }
    }
}

impl Default for ProjectionsConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            mapping: default_projection_keys(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ingestion: IngestionConfig::default(),
            years: YearRange::default(),
            analytics: AnalyticsConfig::default(),
            minerals: default_minerals(),
            projections: ProjectionsConfig::default(),
        }
    }
}
