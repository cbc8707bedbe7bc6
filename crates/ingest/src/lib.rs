//! Throttled parallel ingestion of every raw commodity into the cache.
//!
//! At most `max_concurrent` commodity fetches are in flight. Completions are
//! consumed one at a time in settle order: each batch is indexed under a
//! single cache write guard, then progress is published. A failed commodity
//! is recorded and counted towards progress; it never aborts the run.

pub mod events;

use std::sync::Arc;

use bgs_client::CommoditySource;
use chrono::Utc;
use common::{DashboardConfig, MineralCatalogue};
use futures_util::stream::{self, StreamExt};
use mineral_cache::SharedCache;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

pub use events::{progress_percent, CommodityOutcome, LoadEvent, LoadStatus, RunReport};

const EVENT_CAPACITY: usize = 1024;

/// Drives a `CommoditySource` across all distinct commodities.
pub struct IngestionPipeline {
    source: Arc<dyn CommoditySource>,
    cache: SharedCache,
    commodities: Vec<String>,
    statistic_type: String,
    max_concurrent: usize,
    events: broadcast::Sender<LoadEvent>,
    status: watch::Sender<LoadStatus>,
}

impl IngestionPipeline {
    /// Duplicate commodity strings are dropped, keeping first occurrence.
    pub fn new(
        source: Arc<dyn CommoditySource>,
        cache: SharedCache,
        commodities: Vec<String>,
        statistic_type: impl Into<String>,
        max_concurrent: usize,
    ) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(commodities.len());
        for commodity in commodities {
            if !unique.contains(&commodity) {
                unique.push(commodity);
            }
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status, _) = watch::channel(LoadStatus::default());

        Self {
            source,
            cache,
            commodities: unique,
            statistic_type: statistic_type.into(),
            max_concurrent: max_concurrent.max(1),
            events,
            status,
        }
    }

    /// Pipeline over the catalogue's distinct commodities with the
    /// configured statistic type and concurrency ceiling.
    pub fn from_config(
        source: Arc<dyn CommoditySource>,
        cache: SharedCache,
        catalogue: &MineralCatalogue,
        cfg: &DashboardConfig,
    ) -> Self {
        Self::new(
            source,
            cache,
            catalogue.unique_commodities().to_vec(),
            cfg.api.statistic_type.clone(),
            cfg.ingestion.max_concurrent_requests,
        )
    }

    pub fn commodities(&self) -> &[String] {
        &self.commodities
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Subscribe to lifecycle events. Only events sent after subscribing
    /// are received.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    /// Watch the latest load status.
    pub fn status(&self) -> watch::Receiver<LoadStatus> {
        self.status.subscribe()
    }

    fn publish(&self, event: LoadEvent) {
        // No subscribers is fine; the status channel still tracks state.
        let _ = self.events.send(event);
    }

    /// Run one ingestion pass to completion.
    pub async fn run(&self) -> RunReport {
        let total = self.commodities.len();
        let started_at = Utc::now();

        info!(
            "Loading {} commodities ({} at a time)",
            total, self.max_concurrent
        );
        self.status.send_replace(LoadStatus {
            is_loading: true,
            progress: 0,
            data_ready: false,
        });
        self.publish(LoadEvent::Started { total });

        let mut fetches = stream::iter(self.commodities.iter().cloned())
            .map(|commodity| {
                let source = Arc::clone(&self.source);
                let statistic_type = self.statistic_type.clone();
                async move {
                    let result = source.fetch_commodity(&commodity, &statistic_type).await;
                    (commodity, result)
                }
            })
            .buffer_unordered(self.max_concurrent);

        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0;

        while let Some((commodity, result)) = fetches.next().await {
            let outcome = match result {
                Ok(records) => {
                    let count = records.len();
                    let stats = self.cache.write().await.index_records(records);
                    info!(
                        "Loaded {}: {} rows ({} indexed, {} skipped)",
                        commodity, count, stats.processed, stats.skipped
                    );
                    CommodityOutcome::loaded(commodity.clone(), count)
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", commodity, e);
                    self.publish(LoadEvent::CommodityFailed {
                        commodity: commodity.clone(),
                        reason: e.to_string(),
                    });
                    CommodityOutcome::failed(commodity.clone(), e.to_string())
                }
            };
            outcomes.push(outcome);

            completed += 1;
            let percent = progress_percent(completed, total);
            self.status.send_modify(|s| s.progress = percent);
            self.publish(LoadEvent::Progress {
                completed,
                total,
                percent,
                commodity,
            });
        }

        if total == 0 {
            self.status.send_modify(|s| s.progress = 100);
            self.publish(LoadEvent::Progress {
                completed: 0,
                total: 0,
                percent: 100,
                commodity: String::new(),
            });
        }

        let report = RunReport {
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Data loading complete: {} commodities, {} rows, {} failed",
            report.outcomes.len(),
            report.total_records(),
            report.failure_count()
        );

        self.status.send_replace(LoadStatus {
            is_loading: false,
            progress: 100,
            data_ready: true,
        });
        self.publish(LoadEvent::Ready {
            report: report.clone(),
        });

        report
    }
}
