//! Dataset extraction: raw partition rows → four typed record sets.
//!
//! Session reconstruction is an explicit two-pass group/reduce: pass 1 groups
//! raw events by the composite (visitor_id, session_number) key; pass 2
//! reduces each group to one `SessionRecord`. Tie-breaks are data, not query
//! engine behavior:
//!   - dimensional attributes (country, device, language, referrer) take the
//!     first non-empty value in chronological order;
//!   - first/last seen are min/max timestamps;
//!   - totals are counts over the group;
//!   - absence of a `first_visit` event marks the session as returning.
//! Groups are sorted by (timestamp, event name) before reduction, so the
//! result is deterministic even if the warehouse scan order is not.
//!
//! The fact projections (pageviews, video events, CTA clicks) are
//! independent per-event filters; rows missing their dataset identifier are
//! dropped and counted for data-quality monitoring.

use std::collections::{BTreeSet, HashMap};

use crate::geo::{self, GeoResolution};
use crate::records::{
    session_id, CtaClickRecord, PageviewRecord, RawEvent, SessionRecord, VideoEventName,
    VideoEventRecord,
};

pub const EVENT_PAGE_VIEW: &str = "page_view";
pub const EVENT_FIRST_VISIT: &str = "first_visit";
pub const EVENT_CTA_CLICK: &str = "cta_click";

/// Data-quality counters for one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub raw_events: u64,
    pub dropped_video_rows: u64,
    pub dropped_cta_rows: u64,
    /// Distinct country names geo resolution could not map.
    pub unresolved_countries: Vec<String>,
}

/// The four derived record sets for one sync day, plus quality counters.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDay {
    pub sessions: Vec<SessionRecord>,
    pub pageviews: Vec<PageviewRecord>,
    pub video_events: Vec<VideoEventRecord>,
    pub cta_clicks: Vec<CtaClickRecord>,
    pub stats: ExtractionStats,
}

/// Run all four projections over one day's raw events.
pub fn extract_day(events: &[RawEvent]) -> ExtractedDay {
    let mut stats = ExtractionStats {
        raw_events: events.len() as u64,
        ..Default::default()
    };
    let sessions = build_sessions(events, &mut stats);
    let pageviews = build_pageviews(events);
    let video_events = build_video_events(events, &mut stats);
    let cta_clicks = build_cta_clicks(events, &mut stats);
    ExtractedDay {
        sessions,
        pageviews,
        video_events,
        cta_clicks,
        stats,
    }
}

fn first_non_empty<'a>(
    ordered: &[&'a RawEvent],
    get: impl Fn(&'a RawEvent) -> Option<&'a String>,
) -> Option<String> {
    ordered
        .iter()
        .copied()
        .filter_map(|e| get(e))
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pass 1 + pass 2 of session reconstruction.
pub fn build_sessions(events: &[RawEvent], stats: &mut ExtractionStats) -> Vec<SessionRecord> {
    let mut groups: HashMap<(&str, i64), Vec<&RawEvent>> = HashMap::new();
    for event in events {
        groups
            .entry((event.visitor_id.as_str(), event.session_number))
            .or_default()
            .push(event);
    }

    let mut unresolved: BTreeSet<String> = BTreeSet::new();
    let mut sessions: Vec<SessionRecord> = groups
        .into_iter()
        .map(|((visitor_id, session_number), mut group)| {
            group.sort_by(|a, b| {
                a.event_ts
                    .cmp(&b.event_ts)
                    .then_with(|| a.event_name.cmp(&b.event_name))
            });

            // Groups are non-empty by construction; after sorting the first
            // and last elements carry the min/max timestamps.
            let first_seen = group[0].event_ts;
            let last_seen = group[group.len() - 1].event_ts;
            let country = first_non_empty(&group, |e| e.country.as_ref());
            let (country_iso2, country_iso3) = match country.as_deref().map(geo::resolve) {
                Some(GeoResolution::Resolved { iso2, iso3 }) => {
                    (Some(iso2.to_string()), Some(iso3.to_string()))
                }
                Some(GeoResolution::Unresolved { raw }) => {
                    unresolved.insert(raw);
                    (None, None)
                }
                None => (None, None),
            };
            let total_pageviews = group
                .iter()
                .filter(|e| e.event_name == EVENT_PAGE_VIEW)
                .count() as i64;
            let is_returning = !group.iter().any(|e| e.event_name == EVENT_FIRST_VISIT);

            SessionRecord {
                session_id: session_id(visitor_id, session_number),
                visitor_id: visitor_id.to_string(),
                session_number,
                first_seen,
                last_seen,
                country,
                country_iso2,
                country_iso3,
                device: first_non_empty(&group, |e| e.device.as_ref()),
                language: first_non_empty(&group, |e| e.language.as_ref()),
                referrer: first_non_empty(&group, |e| e.referrer.as_ref()),
                is_returning,
                total_events: group.len() as i64,
                total_pageviews,
                duration_seconds: (last_seen - first_seen).num_seconds(),
            }
        })
        .collect();

    // Stable output order: keyed by the composite session key.
    sessions.sort_by(|a, b| {
        a.visitor_id
            .cmp(&b.visitor_id)
            .then(a.session_number.cmp(&b.session_number))
    });
    stats.unresolved_countries = unresolved.into_iter().collect();
    sessions
}

pub fn build_pageviews(events: &[RawEvent]) -> Vec<PageviewRecord> {
    events
        .iter()
        .filter(|e| e.event_name == EVENT_PAGE_VIEW)
        .map(|e| PageviewRecord {
            event_ts: e.event_ts,
            session_id: session_id(&e.visitor_id, e.session_number),
            visitor_id: e.visitor_id.clone(),
            page_path: e
                .page_path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or("/")
                .to_string(),
            page_title: e.page_title.clone(),
            referrer: e.referrer.clone(),
            locale: e.language.clone(),
        })
        .collect()
}

pub fn build_video_events(
    events: &[RawEvent],
    stats: &mut ExtractionStats,
) -> Vec<VideoEventRecord> {
    let mut out = Vec::new();
    for event in events {
        let Some(name) = VideoEventName::from_raw(&event.event_name) else {
            continue;
        };
        // Data-quality filter: a video event without a video id is unusable.
        let Some(video_id) = event.param_str("video_id") else {
            stats.dropped_video_rows += 1;
            continue;
        };
        out.push(VideoEventRecord {
            event_name: name,
            event_ts: event.event_ts,
            session_id: session_id(&event.visitor_id, event.session_number),
            visitor_id: event.visitor_id.clone(),
            video_id: video_id.to_string(),
            video_title: event.param_str("video_title").map(str::to_string),
            gallery: event.param_str("gallery").map(str::to_string),
            player: event.param_str("player").map(str::to_string),
            locale: event.language.clone(),
            current_time_seconds: event.param_f64("current_time"),
            progress_percent: event.param_f64("progress_percent"),
            watch_time_seconds: event.param_f64("watch_time"),
        });
    }
    out
}

pub fn build_cta_clicks(events: &[RawEvent], stats: &mut ExtractionStats) -> Vec<CtaClickRecord> {
    let mut out = Vec::new();
    for event in events {
        if event.event_name != EVENT_CTA_CLICK {
            continue;
        }
        let Some(cta_id) = event.param_str("cta_id") else {
            stats.dropped_cta_rows += 1;
            continue;
        };
        out.push(CtaClickRecord {
            event_ts: event.event_ts,
            session_id: session_id(&event.visitor_id, event.session_number),
            visitor_id: event.visitor_id.clone(),
            page_path: event.page_path.clone(),
            cta_id: cta_id.to_string(),
            locale: event.language.clone(),
        });
    }
    out
}
