//! Storage abstractions at the crate seam.
//!
//! The warehouse and the analytics store are vendor systems; their wire
//! protocols are fixed elsewhere. The pipeline only needs these two traits,
//! which keeps the orchestrator testable against in-memory backends.

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::SyncError;
use crate::records::{CtaClickRecord, PageviewRecord, RawEvent, SessionRecord, VideoEventRecord};
use crate::sync::RunOutcome;

/// Read-only access to the append-only, daily-partitioned event warehouse.
#[async_trait::async_trait]
pub trait EventWarehouse: Send + Sync {
    /// Fetch every raw event in one day's closed partition.
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<RawEvent>, SyncError>;
}

/// Write access to the relational analytics store. All loads are batched,
/// at-least-once-safe idempotent upserts; each returns the number of rows
/// actually written (conflict-skipped rows are not counted).
#[async_trait::async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn load_sessions(&self, rows: &[SessionRecord]) -> Result<u64>;
    async fn load_pageviews(&self, rows: &[PageviewRecord]) -> Result<u64>;
    async fn load_video_events(&self, rows: &[VideoEventRecord]) -> Result<u64>;
    async fn load_cta_clicks(&self, rows: &[CtaClickRecord]) -> Result<u64>;

    /// Insert the `running` row for this execution; returns the run id.
    async fn start_run(&self, sync_date: NaiveDate) -> Result<String>;
    /// Record the terminal outcome. Called exactly once per run.
    async fn finish_run(&self, run_id: &str, outcome: &RunOutcome) -> Result<()>;
}
