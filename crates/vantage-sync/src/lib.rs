//! Daily pipeline orchestration: extract → geo-resolve → load → record.
//!
//! One invocation covers one closed warehouse partition. There is no
//! internal retry: every load is idempotent, so the recovery path for any
//! failure is a full re-invocation for the same sync date.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use vantage_core::error::SyncError;
use vantage_core::extract::{extract_day, ExtractionStats};
use vantage_core::store::{AnalyticsStore, EventWarehouse};
use vantage_core::sync::{DatasetCounts, RunOutcome, SyncStatus};

/// Outcome of one pipeline invocation, mirroring the persisted sync run.
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: String,
    pub sync_date: NaiveDate,
    pub status: SyncStatus,
    pub counts: DatasetCounts,
    pub errors: Vec<String>,
    pub stats: ExtractionStats,
}

/// Run the full pipeline for one sync date.
///
/// Extraction failure (missing/malformed partition) fails the whole run.
/// Load failures are per-dataset: the failing dataset's remaining batches
/// are skipped, the other datasets still load, and the run finishes as
/// `completed_with_errors`. Only the sync-run tracker decides terminal
/// status; everything below it propagates errors upward.
pub async fn run_sync<W, S>(
    warehouse: &W,
    store: &S,
    sync_date: NaiveDate,
) -> Result<SyncReport, SyncError>
where
    W: EventWarehouse + ?Sized,
    S: AnalyticsStore + ?Sized,
{
    let run_id = store
        .start_run(sync_date)
        .await
        .map_err(SyncError::Tracker)?;
    info!(%sync_date, run_id, "sync run started");

    let raw = match warehouse.fetch_day(sync_date).await {
        Ok(raw) => raw,
        Err(e) => {
            error!(%sync_date, error = %e, "extraction failed, run marked failed");
            let outcome = RunOutcome {
                status: SyncStatus::Failed,
                counts: DatasetCounts::default(),
                errors_count: 1,
                error_details: Some(e.to_string()),
                geo_unresolved: 0,
            };
            if let Err(tracker_err) = store.finish_run(&run_id, &outcome).await {
                error!(run_id, error = %tracker_err, "failed to record failed run");
            }
            return Err(e);
        }
    };

    let day = extract_day(&raw);
    for name in &day.stats.unresolved_countries {
        warn!(raw = %name, "country name did not resolve to ISO codes");
    }
    if day.stats.dropped_video_rows > 0 || day.stats.dropped_cta_rows > 0 {
        warn!(
            dropped_video_rows = day.stats.dropped_video_rows,
            dropped_cta_rows = day.stats.dropped_cta_rows,
            "rows dropped by data-quality filters"
        );
    }
    info!(
        raw_events = day.stats.raw_events,
        sessions = day.sessions.len(),
        pageviews = day.pageviews.len(),
        video_events = day.video_events.len(),
        cta_clicks = day.cta_clicks.len(),
        "extraction complete"
    );

    // Datasets load independently: one failing does not stop the others.
    let mut counts = DatasetCounts::default();
    let mut errors = Vec::new();

    match store.load_sessions(&day.sessions).await {
        Ok(n) => counts.sessions = n,
        Err(source) => errors.push(
            SyncError::Load {
                dataset: "sessions",
                source,
            }
            .to_string(),
        ),
    }
    match store.load_pageviews(&day.pageviews).await {
        Ok(n) => counts.pageviews = n,
        Err(source) => errors.push(
            SyncError::Load {
                dataset: "pageviews",
                source,
            }
            .to_string(),
        ),
    }
    match store.load_video_events(&day.video_events).await {
        Ok(n) => counts.video_events = n,
        Err(source) => errors.push(
            SyncError::Load {
                dataset: "video_events",
                source,
            }
            .to_string(),
        ),
    }
    match store.load_cta_clicks(&day.cta_clicks).await {
        Ok(n) => counts.cta_clicks = n,
        Err(source) => errors.push(
            SyncError::Load {
                dataset: "cta_clicks",
                source,
            }
            .to_string(),
        ),
    }

    let status = if errors.is_empty() {
        SyncStatus::Completed
    } else {
        SyncStatus::CompletedWithErrors
    };
    let outcome = RunOutcome {
        status,
        counts,
        errors_count: errors.len() as u64,
        error_details: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
        geo_unresolved: day.stats.unresolved_countries.len() as u64,
    };
    store
        .finish_run(&run_id, &outcome)
        .await
        .map_err(SyncError::Tracker)?;

    info!(
        run_id,
        status = status.as_str(),
        sessions = counts.sessions,
        pageviews = counts.pageviews,
        video_events = counts.video_events,
        cta_clicks = counts.cta_clicks,
        errors = errors.len(),
        "sync run finished"
    );

    Ok(SyncReport {
        run_id,
        sync_date,
        status,
        counts,
        errors,
        stats: day.stats,
    })
}
