use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use vantage_core::params::ReportRequest;

use crate::queries::{push_session_filters, utc_bounds};
use crate::schema::TS_FORMAT;
use crate::AnalyticsDb;

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    /// Calendar date label (`YYYY-MM-DD`) in the business timezone.
    pub date: String,
    pub sessions: i64,
    pub pageviews: i64,
}

/// Bucket stored UTC timestamps by business-timezone calendar day — the same
/// conversion the window bounds go through, so a row counted by the window
/// scan always lands in one of the window's buckets.
fn count_by_day(timestamps: &[String], tz: Tz) -> Result<HashMap<NaiveDate, i64>> {
    let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
    for raw in timestamps {
        let day = chrono::NaiveDateTime::parse_from_str(raw, TS_FORMAT)?
            .and_utc()
            .with_timezone(&tz)
            .date_naive();
        *counts.entry(day).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Daily sessions/pageviews series over the request window. Every day in
/// the window appears exactly once, zero-filled when nothing happened.
pub async fn trends(db: &AnalyticsDb, req: &ReportRequest) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let tz = db.timezone();
    let (start, end_next) = utc_bounds(tz, req.window)?;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    params.push(Box::new(start.clone()));
    params.push(Box::new(end_next.clone()));
    let mut idx = 3;
    push_session_filters(req, &mut filter_sql, &mut params, &mut idx);

    let sql = format!(
        r#"
        SELECT CAST(s.first_seen AS VARCHAR)
        FROM sessions s
        WHERE s.first_seen >= ?1 AND s.first_seen < ?2
          {filter_sql}
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let session_rows = stmt.query_map(refs.as_slice(), |row| row.get::<_, String>(0))?;
    let session_ts = session_rows.collect::<Result<Vec<_>, _>>()?;
    let sessions_by_day = count_by_day(&session_ts, tz)?;

    let mut stmt = conn.prepare(
        "SELECT CAST(event_ts AS VARCHAR) \
         FROM pageviews WHERE event_ts >= ?1 AND event_ts < ?2",
    )?;
    let pageview_rows =
        stmt.query_map(duckdb::params![start, end_next], |row| row.get::<_, String>(0))?;
    let pageview_ts = pageview_rows.collect::<Result<Vec<_>, _>>()?;
    let pageviews_by_day = count_by_day(&pageview_ts, tz)?;

    // Zero-fill across the whole window so chart consumers never interpolate
    // over missing buckets.
    let mut series = Vec::with_capacity(req.window.num_days() as usize);
    let mut day = req.window.start;
    while day <= req.window.end {
        series.push(TrendPoint {
            date: day.format("%Y-%m-%d").to_string(),
            sessions: sessions_by_day.get(&day).copied().unwrap_or(0),
            pageviews: pageviews_by_day.get(&day).copied().unwrap_or(0),
        });
        day += chrono::Duration::days(1);
    }
    Ok(series)
}
