use anyhow::Result;
use serde::Serialize;

use vantage_core::params::ReportRequest;

use crate::queries::{push_video_filters, utc_bounds};
use crate::AnalyticsDb;

#[derive(Debug, Clone, Serialize)]
pub struct TopVideoRow {
    pub video_id: String,
    pub video_title: Option<String>,
    pub starts: i64,
    pub completes: i64,
    pub viewers: i64,
    pub watch_time_seconds: f64,
    /// completes / starts, 0.0 when nothing started.
    pub completion_rate: f64,
}

/// Videos ranked by start count within the request window.
pub async fn top_videos(
    db: &AnalyticsDb,
    req: &ReportRequest,
    limit: i64,
) -> Result<Vec<TopVideoRow>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = utc_bounds(db.timezone(), req.window)?;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    params.push(Box::new(start));
    params.push(Box::new(end_next));
    let mut idx = 3;
    push_video_filters(req, &mut filter_sql, &mut params, &mut idx);
    let limit_idx = idx;
    params.push(Box::new(limit));

    let sql = format!(
        r#"
        SELECT
            v.video_id,
            ANY_VALUE(v.video_title) AS title,
            SUM(CASE WHEN v.event_name = 'start' THEN 1 ELSE 0 END) AS starts,
            SUM(CASE WHEN v.event_name = 'complete' THEN 1 ELSE 0 END) AS completes,
            COUNT(DISTINCT v.visitor_id) AS viewers,
            COALESCE(SUM(CASE WHEN v.event_name = 'progress' THEN v.watch_time_seconds ELSE 0 END), 0) AS watch_time
        FROM video_events v
        WHERE v.event_ts >= ?1 AND v.event_ts < ?2
          {filter_sql}
        GROUP BY v.video_id
        ORDER BY starts DESC, v.video_id
        LIMIT ?{limit_idx}
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, f64>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (video_id, video_title, starts, completes, viewers, watch_time_seconds) = row?;
        let completion_rate = if starts > 0 {
            completes as f64 / starts as f64
        } else {
            0.0
        };
        out.push(TopVideoRow {
            video_id,
            video_title,
            starts,
            completes,
            viewers,
            watch_time_seconds,
            completion_rate,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoFunnel {
    pub started: i64,
    pub reached_25: i64,
    pub reached_50: i64,
    pub reached_75: i64,
    pub completed: i64,
}

/// Engagement funnel: distinct sessions reaching each progress milestone.
/// Scoped to `req.video_id` when set, otherwise across all videos.
pub async fn video_funnel(db: &AnalyticsDb, req: &ReportRequest) -> Result<VideoFunnel> {
    let conn = db.conn.lock().await;
    let (start, end_next) = utc_bounds(db.timezone(), req.window)?;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    params.push(Box::new(start));
    params.push(Box::new(end_next));
    let mut idx = 3;
    push_video_filters(req, &mut filter_sql, &mut params, &mut idx);

    let sql = format!(
        r#"
        SELECT
            COUNT(DISTINCT CASE WHEN v.event_name = 'start' THEN v.session_id END),
            COUNT(DISTINCT CASE WHEN v.event_name = 'progress' AND v.progress_percent >= 25 THEN v.session_id END),
            COUNT(DISTINCT CASE WHEN v.event_name = 'progress' AND v.progress_percent >= 50 THEN v.session_id END),
            COUNT(DISTINCT CASE WHEN v.event_name = 'progress' AND v.progress_percent >= 75 THEN v.session_id END),
            COUNT(DISTINCT CASE WHEN v.event_name = 'complete' THEN v.session_id END)
        FROM video_events v
        WHERE v.event_ts >= ?1 AND v.event_ts < ?2
          {filter_sql}
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let funnel = stmt.query_row(refs.as_slice(), |row| {
        Ok(VideoFunnel {
            started: row.get(0)?,
            reached_25: row.get(1)?,
            reached_50: row.get(2)?,
            reached_75: row.get(3)?,
            completed: row.get(4)?,
        })
    })?;
    Ok(funnel)
}
