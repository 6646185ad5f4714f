use anyhow::Result;
use serde::Serialize;

use vantage_core::params::ReportRequest;

use crate::queries::utc_bounds;
use crate::AnalyticsDb;

#[derive(Debug, Clone, Serialize)]
pub struct CtaRow {
    pub cta_id: String,
    pub clicks: i64,
    pub sessions: i64,
}

/// CTA clicks grouped by cta id within the request window.
pub async fn cta_breakdown(db: &AnalyticsDb, req: &ReportRequest) -> Result<Vec<CtaRow>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = utc_bounds(db.timezone(), req.window)?;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    params.push(Box::new(start));
    params.push(Box::new(end_next));
    if let Some(ref language) = req.language {
        filter_sql.push_str(" AND c.locale = ?3");
        params.push(Box::new(language.clone()));
    }

    let sql = format!(
        r#"
        SELECT c.cta_id, COUNT(*) AS clicks, COUNT(DISTINCT c.session_id) AS sessions
        FROM cta_clicks c
        WHERE c.event_ts >= ?1 AND c.event_ts < ?2
          {filter_sql}
        GROUP BY c.cta_id
        ORDER BY clicks DESC, c.cta_id
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| {
        Ok(CtaRow {
            cta_id: row.get(0)?,
            clicks: row.get(1)?,
            sessions: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
