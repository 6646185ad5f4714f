use anyhow::Result;
use serde::Serialize;

use vantage_core::params::ReportRequest;

use crate::queries::{push_session_filters, utc_bounds};
use crate::AnalyticsDb;

#[derive(Debug, Clone, Serialize)]
pub struct GeoRow {
    /// ISO 3166-1 alpha-2 code; `None` groups the sessions whose country
    /// name could not be resolved.
    pub country_iso2: Option<String>,
    pub sessions: i64,
    pub visitors: i64,
}

/// Session counts by country within the request window.
pub async fn geo_breakdown(db: &AnalyticsDb, req: &ReportRequest) -> Result<Vec<GeoRow>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = utc_bounds(db.timezone(), req.window)?;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    params.push(Box::new(start));
    params.push(Box::new(end_next));
    let mut idx = 3;
    push_session_filters(req, &mut filter_sql, &mut params, &mut idx);

    let sql = format!(
        r#"
        SELECT s.country_iso2, COUNT(*) AS sessions, COUNT(DISTINCT s.visitor_id) AS visitors
        FROM sessions s
        WHERE s.first_seen >= ?1 AND s.first_seen < ?2
          {filter_sql}
        GROUP BY s.country_iso2
        ORDER BY sessions DESC, s.country_iso2
        "#
    );
    let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(refs.as_slice(), |row| {
        Ok(GeoRow {
            country_iso2: row.get(0)?,
            sessions: row.get(1)?,
            visitors: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
