//! World mineral statistics API client.
//!
//! Fetches every record for one commodity and statistic type across the
//! configured year window, page by page, retrying transient failures.

pub mod filter;
pub mod retry;
pub mod transport;

use async_trait::async_trait;
use common::config::{ApiConfig, IngestionConfig, YearRange};
use common::{Error, RawRecord};
use serde::Deserialize;
use tracing::debug;

pub use filter::build_cql_filter;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, PageRequest, PageTransport};

/// Source of complete commodity record sets. The ingestion pipeline only
/// depends on this trait.
#[async_trait]
pub trait CommoditySource: Send + Sync {
    async fn fetch_commodity(
        &self,
        commodity: &str,
        statistic_type: &str,
    ) -> Result<Vec<RawRecord>, Error>;
}

// ── Response types ────────────────────────────────────────────────────

/// GeoJSON page returned by the items endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Option<FeatureProperties>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub bgs_commodity_trans: Option<String>,
    #[serde(default)]
    pub country_iso3_code: Option<String>,
    #[serde(default)]
    pub country_trans: Option<String>,
    /// ISO date-time string, occasionally a bare number.
    #[serde(default)]
    pub year: Option<serde_json::Value>,
    /// Number or numeric string.
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub units: Option<String>,
}

impl FeatureProperties {
    pub fn into_raw(self) -> RawRecord {
        let year = match self.year {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let quantity = match self.quantity {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|q| q.is_finite());

        RawRecord {
            commodity: self.bgs_commodity_trans,
            entity_code: self.country_iso3_code,
            entity_name: self.country_trans,
            year,
            quantity,
            unit: self.units,
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────

/// Paginating client over a `PageTransport`.
///
/// Page size and year window are fixed at construction so every commodity
/// in a run is fetched with the same shape.
#[derive(Debug, Clone)]
pub struct BgsClient<T = HttpTransport> {
    transport: T,
    page_limit: usize,
    years: YearRange,
    retry: RetryPolicy,
}

impl BgsClient<HttpTransport> {
    pub fn new(api: &ApiConfig, ingestion: &IngestionConfig, years: YearRange) -> Result<Self, Error> {
        Ok(Self::with_transport(
            HttpTransport::new(api)?,
            api.page_limit,
            years,
            RetryPolicy::from_config(ingestion),
        ))
    }
}

impl<T: PageTransport> BgsClient<T> {
    pub fn with_transport(transport: T, page_limit: usize, years: YearRange, retry: RetryPolicy) -> Self {
        Self {
            transport,
            page_limit: page_limit.max(1),
            years,
            retry,
        }
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    /// Fetch all records for a commodity, requesting pages sequentially
    /// until one comes back short or empty.
    pub async fn fetch_all(&self, commodity: &str, statistic_type: &str) -> Result<Vec<RawRecord>, Error> {
        let filter = build_cql_filter(commodity, statistic_type, self.years);
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let request = PageRequest {
                filter: filter.clone(),
                limit: self.page_limit,
                offset,
            };
            let label = format!("{commodity} @ offset {offset}");
            let page = self
                .retry
                .run(&label, || self.transport.get_page(&request))
                .await?;

            let count = page.features.len();
            records.extend(
                page.features
                    .into_iter()
                    .filter_map(|f| f.properties)
                    .map(FeatureProperties::into_raw),
            );

            debug!(
                "{}: page at offset {} returned {} features (total: {})",
                commodity,
                offset,
                count,
                records.len()
            );

            if count < self.page_limit {
                break;
            }
            offset += self.page_limit;
        }

        Ok(records)
    }
}

#[async_trait]
impl<T: PageTransport> CommoditySource for BgsClient<T> {
    async fn fetch_commodity(
        &self,
        commodity: &str,
        statistic_type: &str,
    ) -> Result<Vec<RawRecord>, Error> {
        self.fetch_all(commodity, statistic_type).await
    }
}
