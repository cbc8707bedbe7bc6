//! Lifecycle events and load status published by the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of fetching one raw commodity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityOutcome {
    pub commodity: String,
    /// Rows returned by the source (zero on failure).
    pub records: usize,
    pub error: Option<String>,
}

impl CommodityOutcome {
    pub fn loaded(commodity: String, records: usize) -> Self {
        Self {
            commodity,
            records,
            error: None,
        }
    }

    pub fn failed(commodity: String, reason: String) -> Self {
        Self {
            commodity,
            records: 0,
            error: Some(reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of one ingestion run, in settle order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<CommodityOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.outcomes.iter().map(|o| o.records).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommodityOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Discrete events on the pipeline's broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadEvent {
    Started {
        total: usize,
    },
    /// Published once per settled commodity, success or failure.
    Progress {
        completed: usize,
        total: usize,
        percent: u8,
        commodity: String,
    },
    CommodityFailed {
        commodity: String,
        reason: String,
    },
    /// Terminal event of a run.
    Ready {
        report: RunReport,
    },
}

/// Latest load state, for consumers that join mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStatus {
    pub is_loading: bool,
    pub progress: u8,
    pub data_ready: bool,
}

/// `round(completed / total * 100)`. An empty run is complete.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (completed.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}
