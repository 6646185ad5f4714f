//! Filter resolution: FilterState → timezone-correct date window.
//!
//! All dashboard reports run over a `[start, end]` window of calendar dates
//! in one fixed business timezone — never the caller's local timezone, never
//! UTC-naive arithmetic. Window ends are **inclusive** everywhere in this
//! API; the exclusive-next-day form exists only inside SQL bound computation
//! (see `vantage-duckdb`). Resolution never fails: unparseable input clamps
//! to today's window and surfaces a warning, because this path backs
//! interactive queries that must always return something usable.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The complete set of user-chosen filter fields, held by the caller as an
/// immutable snapshot. Dates travel as `YYYY-MM-DD` strings exactly as the
/// dashboard sends them; parsing (and clamping) happens in [`resolve_window`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub date_preset: Option<String>,
    pub custom_start: Option<String>,
    pub custom_end: Option<String>,
    pub since_date: Option<String>,
    #[serde(default)]
    pub since_enabled: bool,
    pub language: Option<String>,
    pub country: Option<String>,
    pub video_id: Option<String>,
}

/// Resolved `[start, end]` date range, both bounds inclusive.
/// Invariant: `start <= end`, preserved by every constructor in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of calendar days covered, inclusive of both bounds.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A resolved window plus any clamping warnings picked up along the way.
#[derive(Debug, Clone)]
pub struct ResolvedWindow {
    pub window: DateWindow,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Yesterday,
    Last7,
    Last30,
    Last90,
    Custom,
}

impl DatePreset {
    /// Parse the dashboard's preset token. `None` / empty defaults to 30d.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(Self::Last30),
            Some("today") => Some(Self::Today),
            Some("yesterday") => Some(Self::Yesterday),
            Some("7d") => Some(Self::Last7),
            Some("30d") => Some(Self::Last30),
            Some("90d") => Some(Self::Last90),
            Some("custom") => Some(Self::Custom),
            Some(_) => None,
        }
    }

    /// Inclusive span length for the Nd presets.
    fn span_days(&self) -> Option<i64> {
        match self {
            Self::Last7 => Some(7),
            Self::Last30 => Some(30),
            Self::Last90 => Some(90),
            _ => None,
        }
    }
}

/// Today's calendar date in the business timezone.
pub fn business_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Resolve a [`FilterState`] into a date window relative to `today`
/// (see [`business_today`]).
///
/// Preset semantics:
/// - `today` / `yesterday` — single-day window;
/// - `7d` / `30d` / `90d` — inclusive N-day span ending today
///   (`start = today − (N−1)`);
/// - `custom` — explicit bounds; a missing or unparseable bound falls back
///   to today's window with a warning, a reversed pair is swapped.
///
/// Exclusion overlay (`since_enabled` + `since_date`): the since date clips
/// `start` forward (narrowing only, never widening backward); if it also
/// exceeds `end`, `end` is extended to match so the window is never inverted.
pub fn resolve_window(filter: &FilterState, today: NaiveDate) -> ResolvedWindow {
    let mut warnings = Vec::new();

    let preset = match DatePreset::parse(filter.date_preset.as_deref()) {
        Some(p) => p,
        None => {
            warnings.push(format!(
                "unknown date preset {:?}, falling back to today",
                filter.date_preset.as_deref().unwrap_or_default()
            ));
            DatePreset::Today
        }
    };

    let mut window = match preset {
        DatePreset::Today => DateWindow::single(today),
        DatePreset::Yesterday => DateWindow::single(today - chrono::Duration::days(1)),
        DatePreset::Last7 | DatePreset::Last30 | DatePreset::Last90 => {
            let days = preset.span_days().unwrap_or(30);
            DateWindow {
                start: today - chrono::Duration::days(days - 1),
                end: today,
            }
        }
        DatePreset::Custom => {
            let start = filter.custom_start.as_deref().and_then(parse_date);
            let end = filter.custom_end.as_deref().and_then(parse_date);
            match (start, end) {
                (Some(start), Some(end)) if start <= end => DateWindow { start, end },
                (Some(start), Some(end)) => {
                    warnings.push(format!(
                        "custom range {start}..{end} is reversed, swapping bounds"
                    ));
                    DateWindow {
                        start: end,
                        end: start,
                    }
                }
                _ => {
                    warnings
                        .push("custom range missing or unparseable, falling back to today".into());
                    DateWindow::single(today)
                }
            }
        }
    };

    if filter.since_enabled {
        match filter.since_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match parse_date(raw) {
                Some(since) => {
                    if since > window.start {
                        window.start = since;
                    }
                    if since > window.end {
                        window.end = since;
                    }
                }
                None => warnings.push(format!("unparseable since_date {raw:?}, ignoring")),
            },
            _ => warnings.push("since_enabled set without since_date, ignoring".into()),
        }
    }

    debug_assert!(window.start <= window.end);
    ResolvedWindow { window, warnings }
}

/// The immediately preceding, non-overlapping span of equal length.
pub fn previous_period(window: DateWindow) -> DateWindow {
    let days = window.num_days();
    let end = window.start - chrono::Duration::days(1);
    DateWindow {
        start: end - chrono::Duration::days(days - 1),
        end,
    }
}
