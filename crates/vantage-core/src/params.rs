//! Report request construction.
//!
//! [`ReportRequest::build`] is the single construction point turning
//! (report type, FilterState) into canonical query parameters and a
//! collision-free cache key. Every report query takes a `&ReportRequest`;
//! nothing else may hand-assemble parameters or keys — that rule is what
//! keeps one dashboard view's filter change from silently corrupting another
//! view's cached data.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::filters::{previous_period, resolve_window, DateWindow, FilterState};

/// The report shapes the dashboard consumes. Closed set: anything else is a
/// request-construction error, not a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    Kpis,
    TopVideos,
    VideoFunnel,
    Geo,
    Trends,
    Cta,
}

impl ReportType {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "kpis" => Ok(Self::Kpis),
            "top-videos" => Ok(Self::TopVideos),
            "video-funnel" => Ok(Self::VideoFunnel),
            "geo" => Ok(Self::Geo),
            "trends" => Ok(Self::Trends),
            "cta" => Ok(Self::Cta),
            other => Err(anyhow!(
                "unknown report type {other:?}; expected one of: kpis, top-videos, video-funnel, geo, trends, cta"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kpis => "kpis",
            Self::TopVideos => "top-videos",
            Self::VideoFunnel => "video-funnel",
            Self::Geo => "geo",
            Self::Trends => "trends",
            Self::Cta => "cta",
        }
    }
}

/// Canonical request parameters for one report query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub window: DateWindow,
    /// Immediately preceding non-overlapping span of equal length.
    pub previous: DateWindow,
    /// The exclusion date actually in effect (validated, enabled), if any.
    pub since_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub video_id: Option<String>,
    /// Clamping warnings from window resolution, surfaced to the caller.
    pub warnings: Vec<String>,
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Escape a cache-key value so field boundaries stay unambiguous.
fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('&', "%26")
        .replace('=', "%3D")
}

impl ReportRequest {
    /// Build the canonical request for `report_type` from a filter snapshot.
    /// `today` is the business-timezone date (see
    /// [`crate::filters::business_today`]).
    pub fn build(report_type: ReportType, filter: &FilterState, today: NaiveDate) -> Self {
        let resolved = resolve_window(filter, today);
        let since_date = if filter.since_enabled {
            filter
                .since_date
                .as_deref()
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        } else {
            None
        };
        Self {
            report_type,
            window: resolved.window,
            previous: previous_period(resolved.window),
            since_date,
            language: normalize(&filter.language),
            country: normalize(&filter.country),
            video_id: normalize(&filter.video_id),
            warnings: resolved.warnings,
        }
    }

    /// Canonical cache key: identical filter dimensions ⇒ identical key;
    /// a difference in any one dimension ⇒ a different key. Values are
    /// escaped so no combination of inputs can collide across fields.
    pub fn cache_key(&self) -> String {
        format!(
            "report={}&start={}&end={}&since={}&lang={}&country={}&video={}",
            self.report_type.as_str(),
            self.window.start,
            self.window.end,
            self.since_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            self.language.as_deref().map(escape).unwrap_or_else(|| "-".into()),
            self.country.as_deref().map(escape).unwrap_or_else(|| "-".into()),
            self.video_id.as_deref().map(escape).unwrap_or_else(|| "-".into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn base_filter() -> FilterState {
        FilterState {
            date_preset: Some("30d".into()),
            language: Some("en".into()),
            country: Some("US".into()),
            ..Default::default()
        }
    }

    #[test]
    fn identical_filters_produce_identical_keys() {
        let today = date("2025-05-01");
        let a = ReportRequest::build(ReportType::Kpis, &base_filter(), today);
        let b = ReportRequest::build(ReportType::Kpis, &base_filter(), today);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a, b);
    }

    #[test]
    fn country_difference_produces_different_keys() {
        let today = date("2025-05-01");
        let a = ReportRequest::build(ReportType::Kpis, &base_filter(), today);
        let mut other = base_filter();
        other.country = Some("PL".into());
        let b = ReportRequest::build(ReportType::Kpis, &other, today);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn every_dimension_feeds_the_key() {
        let today = date("2025-05-01");
        let base = ReportRequest::build(ReportType::Trends, &base_filter(), today);

        let mut preset = base_filter();
        preset.date_preset = Some("7d".into());

        let mut since = base_filter();
        since.since_enabled = true;
        since.since_date = Some("2025-04-20".into());

        let mut lang = base_filter();
        lang.language = Some("de".into());

        let mut video = base_filter();
        video.video_id = Some("vid_42".into());

        for filter in [&preset, &since, &lang, &video] {
            let req = ReportRequest::build(ReportType::Trends, filter, today);
            assert_ne!(base.cache_key(), req.cache_key());
        }

        let other_report = ReportRequest::build(ReportType::Geo, &base_filter(), today);
        assert_ne!(base.cache_key(), other_report.cache_key());
    }

    #[test]
    fn since_inside_window_still_changes_the_key() {
        // since earlier than the computed start leaves the window untouched;
        // the key must still differ because the exclusion date is a dimension.
        let today = date("2025-05-01");
        let base = ReportRequest::build(ReportType::Kpis, &base_filter(), today);
        let mut with_since = base_filter();
        with_since.since_enabled = true;
        with_since.since_date = Some("2020-01-01".into());
        let req = ReportRequest::build(ReportType::Kpis, &with_since, today);
        assert_eq!(req.window, base.window);
        assert_ne!(req.cache_key(), base.cache_key());
    }

    #[test]
    fn delimiter_values_cannot_collide_across_fields() {
        let today = date("2025-05-01");
        let mut a = base_filter();
        a.language = Some("en&country=US".into());
        a.country = None;
        let mut b = base_filter();
        b.language = Some("en".into());
        b.country = Some("US".into());
        let key_a = ReportRequest::build(ReportType::Kpis, &a, today).cache_key();
        let key_b = ReportRequest::build(ReportType::Kpis, &b, today).cache_key();
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn blank_dimensions_normalize_to_absent() {
        let today = date("2025-05-01");
        let mut padded = base_filter();
        padded.video_id = Some("  ".into());
        let req = ReportRequest::build(ReportType::Kpis, &padded, today);
        assert_eq!(req.video_id, None);
        assert_eq!(
            req.cache_key(),
            ReportRequest::build(ReportType::Kpis, &base_filter(), today).cache_key()
        );
    }

    #[test]
    fn report_type_round_trips() {
        for raw in ["kpis", "top-videos", "video-funnel", "geo", "trends", "cta"] {
            assert_eq!(ReportType::parse(raw).unwrap().as_str(), raw);
        }
        assert!(ReportType::parse("stats").is_err());
    }
}
