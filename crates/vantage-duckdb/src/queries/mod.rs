//! Dashboard report queries.
//!
//! Every function here takes a [`vantage_core::params::ReportRequest`] —
//! the single construction point for parameters and cache keys — and never
//! accepts loose filter arguments. Date windows arrive as inclusive calendar
//! dates in the business timezone; [`utc_bounds`] converts them to the
//! half-open UTC timestamp range the fact tables are scanned with.

use anyhow::{anyhow, Result};
use chrono::LocalResult;
use chrono::TimeZone;
use chrono_tz::Tz;

use vantage_core::filters::DateWindow;
use vantage_core::params::ReportRequest;

pub mod cta;
pub mod geo;
pub mod kpis;
pub mod trends;
pub mod videos;

fn local_midnight_utc(tz: Tz, date: chrono::NaiveDate) -> Result<chrono::NaiveDateTime> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid_date_boundary"))?;
    let zoned = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(a, b) => a.min(b),
        LocalResult::None => return Err(anyhow!("invalid_timezone_transition")),
    };
    Ok(zoned.with_timezone(&chrono::Utc).naive_utc())
}

/// Inclusive local-date window → `[start, end_next)` UTC timestamp strings.
pub(crate) fn utc_bounds(tz: Tz, window: DateWindow) -> Result<(String, String)> {
    let start_utc = local_midnight_utc(tz, window.start)?;
    let end_next_utc = local_midnight_utc(tz, window.end + chrono::Duration::days(1))?;
    Ok((
        start_utc.format("%Y-%m-%d %H:%M:%S").to_string(),
        end_next_utc.format("%Y-%m-%d %H:%M:%S").to_string(),
    ))
}

/// Append session-dimension filters (language, country) to a WHERE clause.
/// Bind positions continue from `param_idx`.
pub(crate) fn push_session_filters(
    req: &ReportRequest,
    filter_sql: &mut String,
    params: &mut Vec<Box<dyn duckdb::types::ToSql>>,
    param_idx: &mut usize,
) {
    if let Some(ref language) = req.language {
        filter_sql.push_str(&format!(" AND s.language = ?{}", param_idx));
        params.push(Box::new(language.clone()));
        *param_idx += 1;
    }
    if let Some(ref country) = req.country {
        filter_sql.push_str(&format!(" AND s.country_iso2 = ?{}", param_idx));
        params.push(Box::new(country.clone()));
        *param_idx += 1;
    }
}

/// Append video-fact filters (locale, video id) to a WHERE clause.
pub(crate) fn push_video_filters(
    req: &ReportRequest,
    filter_sql: &mut String,
    params: &mut Vec<Box<dyn duckdb::types::ToSql>>,
    param_idx: &mut usize,
) {
    if let Some(ref language) = req.language {
        filter_sql.push_str(&format!(" AND v.locale = ?{}", param_idx));
        params.push(Box::new(language.clone()));
        *param_idx += 1;
    }
    if let Some(ref video_id) = req.video_id {
        filter_sql.push_str(&format!(" AND v.video_id = ?{}", param_idx));
        params.push(Box::new(video_id.clone()));
        *param_idx += 1;
    }
}
