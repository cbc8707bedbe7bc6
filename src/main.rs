//! minerals-dashboard: critical mineral production data core.
//!
//! Single-binary Tokio application that:
//! 1. Fetches every catalogue commodity from the statistics API
//! 2. Indexes the rows into the in-memory cache
//! 3. Loads the demand/supply projection snapshot alongside
//! 4. Reports rankings, concentration and dominance for one year

mod config;

use std::{
    fs::{create_dir_all, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use analytics::{AnalyticsEngine, Concentration};
use bgs_client::BgsClient;
use common::config::DashboardConfig;
use common::{MineralCatalogue, ALL_MINERALS_KEY};
use ingest::{IngestionPipeline, LoadEvent, RunReport};
use mineral_cache::{new_shared_cache, DataCache};
use projections::{ProjectionStore, Scenario};

/// Critical Minerals Dashboard data core
#[derive(Parser)]
#[command(name = "minerals-dashboard", about = "Critical mineral production data core")]
struct Cli {
    /// Config file (TOML). Defaults are used when it does not exist.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Year to report on. Defaults to the last configured year.
    #[arg(long)]
    year: Option<i32>,

    /// Mineral to report on, or the overview when omitted.
    #[arg(long)]
    mineral: Option<String>,

    /// Number of producers / leaderboard rows to show.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Projection scenario: STEPS, APS or NZE.
    #[arg(long, default_value = "STEPS")]
    scenario: Scenario,

    /// Do not load the projection snapshot.
    #[arg(long)]
    skip_projections: bool,

    /// Write load events as JSON lines into this directory.
    #[arg(long)]
    events_dir: Option<PathBuf>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only JSONL log of one ingestion run.
struct EventJournal {
    path: PathBuf,
    file: File,
}

impl EventJournal {
    fn open(dir: &Path) -> std::io::Result<Self> {
        create_dir_all(dir)?;
        let path = dir.join(format!("load-{}.jsonl", Utc::now().format("%Y-%m-%d")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    fn write_event(&mut self, event: &LoadEvent) {
        let write_result = (|| -> std::io::Result<()> {
            let line = json!({ "ts": now_iso(), "event": event });
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Event journal write failed: {}", e);
        }
    }
}

/// Log lifecycle events until the run is ready.
async fn watch_events(mut rx: broadcast::Receiver<LoadEvent>, mut journal: Option<EventJournal>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event watcher lagged, skipped {} events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Some(journal) = journal.as_mut() {
            journal.write_event(&event);
        }

        match &event {
            LoadEvent::Started { total } => info!("Loading {} commodities...", total),
            LoadEvent::Progress {
                completed,
                total,
                percent,
                commodity,
            } => info!("[{:>3}%] {}/{} {}", percent, completed, total, commodity),
            LoadEvent::CommodityFailed { commodity, reason } => {
                warn!("{} failed: {}", commodity, reason)
            }
            LoadEvent::Ready { .. } => break,
        }
    }
}

async fn load_projections(store: &ProjectionStore, cfg: &DashboardConfig) {
    if cfg.projections.path.is_none() && cfg.projections.url.is_none() {
        info!("No projection data configured, skipping");
        return;
    }
    if let Err(e) = store.load(&cfg.projections).await {
        warn!("Projection data unavailable: {}", e);
    }
}

fn format_quantity(value: f64, unit: &str) -> String {
    if value >= 1_000_000.0 {
        format!("{:.2}M {}", value / 1_000_000.0, unit)
    } else if value >= 1_000.0 {
        format!("{:.1}k {}", value / 1_000.0, unit)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

fn report_run(report: &RunReport, cache: &DataCache) {
    let summary = cache.summary();
    info!(
        "Run finished in {}ms: {} rows from {} commodities ({} failed)",
        (report.finished_at - report.started_at).num_milliseconds(),
        report.total_records(),
        report.outcomes.len(),
        report.failure_count()
    );
    info!(
        "Cache: {} records, {} minerals, {} entities, {} years",
        summary.record_count, summary.mineral_count, summary.entity_count, summary.year_count
    );
    for failure in report.failures() {
        warn!(
            "  ✗ {}: {}",
            failure.commodity,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn report_overview(engine: &AnalyticsEngine, cache: &DataCache, year: i32, top: usize) {
    info!("── {} ({}) ──", ALL_MINERALS_KEY, year);
    let board = engine.dominance_leaderboard(cache, year, top);
    if board.is_empty() {
        info!("No production data for {}", year);
        return;
    }
    for (i, entry) in board.iter().enumerate() {
        info!(
            "{:>2}. {:<28} score={:<4} minerals={:<2} top5={}",
            i + 1,
            entry.display_name,
            entry.score,
            entry.mineral_count,
            entry.top5_count
        );
    }
}

fn report_mineral(
    engine: &AnalyticsEngine,
    cache: &DataCache,
    projections: &ProjectionStore,
    cli: &Cli,
    mineral: &str,
    year: i32,
) {
    info!("── {} ({}) ──", mineral, year);

    if cache.catalogue().get(mineral).is_none() {
        warn!("Unknown mineral '{}'", mineral);
        return;
    }
    let Some(total) = engine.world_total(cache, mineral, year) else {
        info!("{} has no production data source", mineral);
        return;
    };

    let unit = cache.catalogue().unit(mineral).unwrap_or(common::DEFAULT_UNIT);
    info!("World total: {}", format_quantity(total, unit));

    for share in engine.market_shares(cache, mineral, year).iter().take(cli.top) {
        info!(
            "  {:<28} {:>14} {:>6.1}%",
            share.entity_name,
            format_quantity(share.quantity, unit),
            share.share_pct
        );
    }

    match engine.concentration(cache, mineral, year) {
        Concentration::Index { value, band } => info!("HHI: {} ({})", value, band.label()),
        Concentration::Undefined => info!("HHI: n/a"),
    }

    if let Some(multiplier) = projections.demand_growth(mineral, cli.scenario) {
        info!(
            "{} cleantech demand growth 2024→2050: {:.1}x",
            cli.scenario.label(),
            multiplier
        );
    }
}

fn report_projections(projections: &ProjectionStore, scenario: Scenario, top: usize) {
    if !projections.is_ready() {
        return;
    }
    info!("── Projections: {} ({}) ──", scenario.label(), projections.source());
    for row in projections.growth_table(scenario).iter().take(top) {
        match row.multiplier {
            Some(m) => info!("  {:<28} {:>6.1}x", row.mineral, m),
            None => info!("  {:<28}   new", row.mineral),
        }
    }
    for gap in projections.supply_demand_gap(scenario, 2030) {
        if let Some(value) = gap.gap {
            info!("  {:<28} 2030 supply gap {:+.0} kt", gap.mineral, value);
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "minerals_dashboard=info,bgs_client=info,ingest=info,mineral_cache=info,analytics=info,projections=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Minerals dashboard starting up...");

    // Load configuration.
    let cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let catalogue = MineralCatalogue::from_config(&cfg.minerals);
    info!(
        "Catalogue: {} minerals, {} distinct commodities, years {}..={}",
        catalogue.len(),
        catalogue.unique_commodities().len(),
        cfg.years.min,
        cfg.years.max
    );
    info!(
        "Ingestion: {} concurrent, {} retries, {}ms base backoff, page size {}",
        cfg.ingestion.max_concurrent_requests,
        cfg.ingestion.max_retries,
        cfg.ingestion.retry_base_delay_ms,
        cfg.api.page_limit
    );

    let client = match BgsClient::new(&cfg.api, &cfg.ingestion, cfg.years) {
        Ok(c) => c,
        Err(e) => {
            error!("Client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Shared state ─────────────────────────────────────────────────
    let cache = new_shared_cache(catalogue.clone());
    let projections = ProjectionStore::from_config(&cfg.projections);
    let pipeline = IngestionPipeline::from_config(Arc::new(client), cache.clone(), &catalogue, &cfg);

    let journal = match cli.events_dir.as_deref().map(EventJournal::open).transpose() {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to initialize event journal: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(j) = &journal {
        info!("Event journal path: {}", j.path.display());
    }
    let watcher = tokio::spawn(watch_events(pipeline.subscribe(), journal));

    // ── Load ─────────────────────────────────────────────────────────
    let (report, ()) = tokio::join!(pipeline.run(), async {
        if !cli.skip_projections {
            load_projections(&projections, &cfg).await;
        }
    });
    if let Err(e) = watcher.await {
        warn!("Event watcher stopped: {}", e);
    }

    // ── Report ───────────────────────────────────────────────────────
    let cache = cache.read().await;
    report_run(&report, &cache);

    if !cache.has_data() {
        error!("No data loaded");
        std::process::exit(1);
    }

    let year = cli.year.unwrap_or(cfg.years.max);
    if !cfg.years.contains(year) {
        warn!(
            "Year {} is outside the loaded range {}..={}",
            year, cfg.years.min, cfg.years.max
        );
    }

    let engine = AnalyticsEngine::new(cfg.analytics.clone());
    match cli.mineral.as_deref() {
        None | Some(ALL_MINERALS_KEY) => report_overview(&engine, &cache, year, cli.top),
        Some(mineral) => report_mineral(&engine, &cache, &projections, &cli, mineral, year),
    }
    report_projections(&projections, cli.scenario, cli.top);
}
