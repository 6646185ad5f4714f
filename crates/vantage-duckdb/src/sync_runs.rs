//! Sync-run tracker: one `sync_runs` row per pipeline execution.
//!
//! Insert at start (`running`), update exactly once at completion. No delete
//! path exists; the table is the pipeline's audit log. Recovery from any
//! failure is a full re-invocation for the same sync date — safe because
//! every load is idempotent — which creates a fresh row.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use vantage_core::sync::{DatasetCounts, RunOutcome, SyncRun, SyncStatus};

use crate::backend::AnalyticsDb;
use crate::schema::TS_FORMAT;

impl AnalyticsDb {
    pub async fn start_run(&self, sync_date: NaiveDate) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sync_runs (id, sync_date, start_time, status) VALUES (?1, ?2, ?3, ?4)",
            duckdb::params![
                id,
                sync_date.format("%Y-%m-%d").to_string(),
                Utc::now().format(TS_FORMAT).to_string(),
                SyncStatus::Running.as_str(),
            ],
        )?;
        Ok(id)
    }

    pub async fn finish_run(&self, run_id: &str, outcome: &RunOutcome) -> Result<()> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE sync_runs SET
                end_time = ?1,
                status = ?2,
                sessions_loaded = ?3,
                pageviews_loaded = ?4,
                video_events_loaded = ?5,
                cta_clicks_loaded = ?6,
                errors_count = ?7,
                error_details = ?8,
                geo_unresolved = ?9
             WHERE id = ?10 AND status = 'running'",
            duckdb::params![
                Utc::now().format(TS_FORMAT).to_string(),
                outcome.status.as_str(),
                outcome.counts.sessions as i64,
                outcome.counts.pageviews as i64,
                outcome.counts.video_events as i64,
                outcome.counts.cta_clicks as i64,
                outcome.errors_count as i64,
                outcome.error_details,
                outcome.geo_unresolved as i64,
                run_id,
            ],
        )?;
        // A second completion attempt means the state machine was violated.
        if updated != 1 {
            return Err(anyhow!("sync run {run_id} is not in the running state"));
        }
        Ok(())
    }

    pub async fn get_run(&self, run_id: &str) -> Result<SyncRun> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, CAST(sync_date AS VARCHAR), CAST(start_time AS VARCHAR), \
             CAST(end_time AS VARCHAR), status, \
             sessions_loaded, pageviews_loaded, video_events_loaded, cta_clicks_loaded, \
             errors_count, error_details, geo_unresolved \
             FROM sync_runs WHERE id = ?1",
        )?;
        let raw = stmt.query_row(duckdb::params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, i64>(9)?,
                row.get::<_, Option<String>>(10)?,
                row.get::<_, i64>(11)?,
            ))
        })?;

        let status = SyncStatus::parse(&raw.4)
            .ok_or_else(|| anyhow!("unknown sync status {:?} on run {run_id}", raw.4))?;
        Ok(SyncRun {
            id: raw.0,
            sync_date: NaiveDate::parse_from_str(&raw.1, "%Y-%m-%d")?,
            start_time: chrono::NaiveDateTime::parse_from_str(&raw.2, TS_FORMAT)?.and_utc(),
            end_time: raw
                .3
                .map(|s| chrono::NaiveDateTime::parse_from_str(&s, TS_FORMAT).map(|t| t.and_utc()))
                .transpose()?,
            status,
            counts: DatasetCounts {
                sessions: raw.5 as u64,
                pageviews: raw.6 as u64,
                video_events: raw.7 as u64,
                cta_clicks: raw.8 as u64,
            },
            errors_count: raw.9 as u64,
            error_details: raw.10,
            geo_unresolved: raw.11 as u64,
        })
    }
}
