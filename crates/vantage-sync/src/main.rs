use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use vantage_core::config::Config;
use vantage_core::filters::business_today;
use vantage_core::sync::SyncStatus;
use vantage_duckdb::load::DayLoader;
use vantage_duckdb::{AnalyticsDb, WarehouseClient};

/// `vantage-sync [YYYY-MM-DD]`
///
/// Syncs one day's warehouse partition into the analytics store. With no
/// argument, syncs yesterday in the business timezone — the partition the
/// external scheduler closes overnight. Exits non-zero on missing
/// configuration or a failed run so the scheduler can alert.
#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging; level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vantage=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow!(e))?;
    let tz = cfg.business_tz().map_err(|e| anyhow!(e))?;

    let sync_date = match std::env::args().nth(1) {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid sync date argument {raw:?}, expected YYYY-MM-DD"))?,
        None => business_today(tz) - chrono::Duration::days(1),
    };

    let warehouse = WarehouseClient::open(&cfg.warehouse_path)?;
    let db = AnalyticsDb::open(
        &cfg.analytics_path,
        &cfg.duckdb_memory_limit,
        tz,
        cfg.batch_size,
    )?;
    let store = DayLoader { db, sync_date };

    let report = vantage_sync::run_sync(&warehouse, &store, sync_date)
        .await
        .with_context(|| format!("sync failed for {sync_date}"))?;

    match report.status {
        SyncStatus::Completed => info!(run_id = %report.run_id, "sync completed"),
        SyncStatus::CompletedWithErrors => {
            // Partial success: recorded in sync_runs, rerun when the cause is
            // fixed. The rerun is always safe (idempotent upserts).
            for err in &report.errors {
                warn!(error = %err, "dataset load error");
            }
            warn!(run_id = %report.run_id, "sync completed with errors");
        }
        // run_sync returns Err for failed runs; Running never reaches here.
        SyncStatus::Failed | SyncStatus::Running => {}
    }

    Ok(())
}
