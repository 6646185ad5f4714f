use anyhow::Result;
use serde::Serialize;

use vantage_core::filters::DateWindow;
use vantage_core::params::ReportRequest;

use crate::queries::{push_session_filters, push_video_filters, utc_bounds};
use crate::AnalyticsDb;

/// Headline totals for one period.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodKpis {
    pub sessions: i64,
    pub visitors: i64,
    pub returning_sessions: i64,
    pub pageviews: i64,
    pub avg_duration_seconds: f64,
    pub video_starts: i64,
    pub video_completes: i64,
    pub cta_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiReport {
    pub current: PeriodKpis,
    pub previous: PeriodKpis,
}

/// KPI totals for the request window plus its previous period.
pub async fn kpi_report(db: &AnalyticsDb, req: &ReportRequest) -> Result<KpiReport> {
    let conn = db.conn.lock().await;
    let current = query_period(&conn, db, req, req.window)?;
    let previous = query_period(&conn, db, req, req.previous)?;
    Ok(KpiReport { current, previous })
}

fn query_period(
    conn: &duckdb::Connection,
    db: &AnalyticsDb,
    req: &ReportRequest,
    window: DateWindow,
) -> Result<PeriodKpis> {
    let (start, end_next) = utc_bounds(db.timezone(), window)?;

    let mut session_sql = String::new();
    let mut session_params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    session_params.push(Box::new(start.clone()));
    session_params.push(Box::new(end_next.clone()));
    let mut idx = 3;
    push_session_filters(req, &mut session_sql, &mut session_params, &mut idx);

    let sql = format!(
        r#"
        WITH windowed AS (
            SELECT s.visitor_id, s.is_returning, s.total_pageviews, s.duration_seconds
            FROM sessions s
            WHERE s.first_seen >= ?1 AND s.first_seen < ?2
              {session_sql}
        )
        SELECT
            COUNT(*) AS sessions,
            COUNT(DISTINCT visitor_id) AS visitors,
            COALESCE(SUM(CASE WHEN is_returning THEN 1 ELSE 0 END), 0) AS returning_sessions,
            COALESCE(SUM(total_pageviews), 0) AS pageviews,
            COALESCE(AVG(duration_seconds), 0) AS avg_duration
        FROM windowed
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = session_params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let (sessions, visitors, returning_sessions, pageviews, avg_duration) =
        stmt.query_row(refs.as_slice(), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

    let mut video_sql = String::new();
    let mut video_params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    video_params.push(Box::new(start.clone()));
    video_params.push(Box::new(end_next.clone()));
    let mut idx = 3;
    push_video_filters(req, &mut video_sql, &mut video_params, &mut idx);

    let sql = format!(
        "SELECT \
            COALESCE(SUM(CASE WHEN v.event_name = 'start' THEN 1 ELSE 0 END), 0), \
            COALESCE(SUM(CASE WHEN v.event_name = 'complete' THEN 1 ELSE 0 END), 0) \
         FROM video_events v \
         WHERE v.event_ts >= ?1 AND v.event_ts < ?2 {video_sql}"
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = video_params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let (video_starts, video_completes) = stmt.query_row(refs.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut cta_sql = String::new();
    let mut cta_params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    cta_params.push(Box::new(start));
    cta_params.push(Box::new(end_next));
    if let Some(ref language) = req.language {
        cta_sql.push_str(" AND c.locale = ?3");
        cta_params.push(Box::new(language.clone()));
    }

    let sql = format!(
        "SELECT COUNT(*) FROM cta_clicks c \
         WHERE c.event_ts >= ?1 AND c.event_ts < ?2 {cta_sql}"
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = cta_params.iter().map(|p| p.as_ref()).collect();
    let cta_clicks: i64 = conn.prepare(&sql)?.query_row(refs.as_slice(), |row| row.get(0))?;

    Ok(PeriodKpis {
        sessions,
        visitors,
        returning_sessions,
        pageviews,
        avg_duration_seconds: avg_duration,
        video_starts,
        video_completes,
        cta_clicks,
    })
}
