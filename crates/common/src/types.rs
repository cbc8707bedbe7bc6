//! Record types shared between the client, cache, and analytics crates.

use serde::{Deserialize, Serialize};

/// Unit assumed when the source omits one.
pub const DEFAULT_UNIT: &str = "tonnes";

/// One row as delivered by the statistics source, before validation.
///
/// Every field is optional; the cache decides which rows are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Raw source commodity string.
    pub commodity: Option<String>,
    /// ISO3-style country code.
    pub entity_code: Option<String>,
    pub entity_name: Option<String>,
    /// Reporting period as sent by the source (e.g. "2022-01-01T00:00:00").
    pub year: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl RawRecord {
    /// Parsed reporting year, if the period string starts with one.
    pub fn parsed_year(&self) -> Option<i32> {
        self.year.as_deref().and_then(parse_year)
    }
}

/// A validated observation retained by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Mineral (commodity group) display name.
    pub mineral: String,
    pub entity_code: String,
    pub entity_name: Option<String>,
    pub year: i32,
    pub quantity: Option<f64>,
    pub unit: String,
}

impl Record {
    /// Display name, falling back to the entity code.
    pub fn display_name(&self) -> &str {
        self.entity_name.as_deref().unwrap_or(&self.entity_code)
    }

    /// True when the record reports a strictly positive quantity.
    pub fn is_producing(&self) -> bool {
        matches!(self.quantity, Some(q) if q > 0.0)
    }
}

/// Simplified entry appended to the ingestion log, one per raw row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// First mineral the raw commodity maps to.
    pub mineral: String,
    pub year: i32,
    pub entity_code: String,
    pub quantity: Option<f64>,
    pub unit: String,
}

/// Extract the year from a source date string ("2022-01-01T00:00:00" → 2022).
pub fn parse_year(raw: &str) -> Option<i32> {
    let prefix = raw.trim().get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Start-of-year timestamp in the source's filter format.
pub fn year_start(year: i32) -> String {
    format!("{year}-01-01T00:00:00")
}

/// End-of-year timestamp in the source's filter format.
pub fn year_end(year: i32) -> String {
    format!("{year}-12-31T23:59:59")
}
