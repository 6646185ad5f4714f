//! Idempotent batch loaders for the four derived datasets.
//!
//! Each loader chunks its rows (`Config.batch_size`, default 1000), wraps
//! each chunk in one transaction, and awaits batches sequentially — a batch
//! failure aborts that dataset's remaining batches and propagates, while
//! other datasets load independently. Conflict handling:
//!   - sessions: `ON CONFLICT DO UPDATE` — latest full-day aggregate wins;
//!   - pageviews / video_events / cta_clicks: `ON CONFLICT DO NOTHING` —
//!     immutable facts, first write wins.
//! Returned counts are rows actually written; conflict-skipped rows are not
//! counted, which makes reruns visibly no-ops in the sync run record.

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use vantage_core::records::{CtaClickRecord, PageviewRecord, SessionRecord, VideoEventRecord};
use vantage_core::store::AnalyticsStore;
use vantage_core::sync::RunOutcome;

use crate::backend::AnalyticsDb;
use crate::schema::TS_FORMAT;

impl AnalyticsDb {
    pub async fn load_sessions(&self, rows: &[SessionRecord], sync_date: NaiveDate) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sync_date_str = sync_date.format("%Y-%m-%d").to_string();
        let mut written = 0u64;
        let mut conn = self.conn.lock().await;
        for batch in rows.chunks(self.batch_size) {
            let tx = conn.transaction()?;
            for row in batch {
                written += tx.execute(
                    r#"INSERT INTO sessions (
                        session_id, visitor_id, session_number, sync_date,
                        first_seen, last_seen,
                        country, country_iso2, country_iso3,
                        device, language, referrer,
                        is_returning, total_events, total_pageviews, duration_seconds
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                    ON CONFLICT (session_id) DO UPDATE SET
                        sync_date = EXCLUDED.sync_date,
                        first_seen = EXCLUDED.first_seen,
                        last_seen = EXCLUDED.last_seen,
                        country = EXCLUDED.country,
                        country_iso2 = EXCLUDED.country_iso2,
                        country_iso3 = EXCLUDED.country_iso3,
                        device = EXCLUDED.device,
                        language = EXCLUDED.language,
                        referrer = EXCLUDED.referrer,
                        is_returning = EXCLUDED.is_returning,
                        total_events = EXCLUDED.total_events,
                        total_pageviews = EXCLUDED.total_pageviews,
                        duration_seconds = EXCLUDED.duration_seconds"#,
                    duckdb::params![
                        row.session_id,
                        row.visitor_id,
                        row.session_number,
                        sync_date_str,
                        row.first_seen.format(TS_FORMAT).to_string(),
                        row.last_seen.format(TS_FORMAT).to_string(),
                        row.country,
                        row.country_iso2,
                        row.country_iso3,
                        row.device,
                        row.language,
                        row.referrer,
                        row.is_returning,
                        row.total_events,
                        row.total_pageviews,
                        row.duration_seconds,
                    ],
                )? as u64;
            }
            tx.commit()?;
        }
        debug!(rows = rows.len(), written, "sessions loaded");
        Ok(written)
    }

    pub async fn load_pageviews(&self, rows: &[PageviewRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut written = 0u64;
        let mut conn = self.conn.lock().await;
        for batch in rows.chunks(self.batch_size) {
            let tx = conn.transaction()?;
            for row in batch {
                written += tx.execute(
                    "INSERT INTO pageviews (event_ts, session_id, visitor_id, page_path, page_title, referrer, locale) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                     ON CONFLICT (event_ts, visitor_id, page_path) DO NOTHING",
                    duckdb::params![
                        row.event_ts.format(TS_FORMAT).to_string(),
                        row.session_id,
                        row.visitor_id,
                        row.page_path,
                        row.page_title,
                        row.referrer,
                        row.locale,
                    ],
                )? as u64;
            }
            tx.commit()?;
        }
        debug!(rows = rows.len(), written, "pageviews loaded");
        Ok(written)
    }

    pub async fn load_video_events(&self, rows: &[VideoEventRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut written = 0u64;
        let mut conn = self.conn.lock().await;
        for batch in rows.chunks(self.batch_size) {
            let tx = conn.transaction()?;
            for row in batch {
                written += tx.execute(
                    "INSERT INTO video_events (event_name, event_ts, session_id, visitor_id, video_id, \
                     video_title, gallery, player, locale, current_time_seconds, progress_percent, watch_time_seconds) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                     ON CONFLICT (event_ts, visitor_id, event_name, video_id) DO NOTHING",
                    duckdb::params![
                        row.event_name.as_str(),
                        row.event_ts.format(TS_FORMAT).to_string(),
                        row.session_id,
                        row.visitor_id,
                        row.video_id,
                        row.video_title,
                        row.gallery,
                        row.player,
                        row.locale,
                        row.current_time_seconds,
                        row.progress_percent,
                        row.watch_time_seconds,
                    ],
                )? as u64;
            }
            tx.commit()?;
        }
        debug!(rows = rows.len(), written, "video events loaded");
        Ok(written)
    }

    pub async fn load_cta_clicks(&self, rows: &[CtaClickRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut written = 0u64;
        let mut conn = self.conn.lock().await;
        for batch in rows.chunks(self.batch_size) {
            let tx = conn.transaction()?;
            for row in batch {
                written += tx.execute(
                    "INSERT INTO cta_clicks (event_ts, session_id, visitor_id, page_path, cta_id, locale) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT (event_ts, visitor_id, cta_id) DO NOTHING",
                    duckdb::params![
                        row.event_ts.format(TS_FORMAT).to_string(),
                        row.session_id,
                        row.visitor_id,
                        row.page_path,
                        row.cta_id,
                        row.locale,
                    ],
                )? as u64;
            }
            tx.commit()?;
        }
        debug!(rows = rows.len(), written, "CTA clicks loaded");
        Ok(written)
    }
}

/// The sessions loader needs the sync date for its column; the trait carries
/// it through a per-run wrapper so the orchestrator stays storage-agnostic.
pub struct DayLoader {
    pub db: AnalyticsDb,
    pub sync_date: NaiveDate,
}

#[async_trait::async_trait]
impl AnalyticsStore for DayLoader {
    async fn load_sessions(&self, rows: &[SessionRecord]) -> Result<u64> {
        self.db.load_sessions(rows, self.sync_date).await
    }

    async fn load_pageviews(&self, rows: &[PageviewRecord]) -> Result<u64> {
        self.db.load_pageviews(rows).await
    }

    async fn load_video_events(&self, rows: &[VideoEventRecord]) -> Result<u64> {
        self.db.load_video_events(rows).await
    }

    async fn load_cta_clicks(&self, rows: &[CtaClickRecord]) -> Result<u64> {
        self.db.load_cta_clicks(rows).await
    }

    async fn start_run(&self, sync_date: NaiveDate) -> Result<String> {
        self.db.start_run(sync_date).await
    }

    async fn finish_run(&self, run_id: &str, outcome: &RunOutcome) -> Result<()> {
        self.db.finish_run(run_id, outcome).await
    }
}
