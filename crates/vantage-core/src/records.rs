use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One row of the raw event warehouse, as stored in a daily partition.
///
/// Fixed dimension columns are always present (possibly empty); everything
/// else the collector attached travels in `params` as a loosely-typed JSON
/// object. Extraction projects `params` into the typed fact records below —
/// any parameter a projection does not name explicitly is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_name: String,
    pub event_ts: DateTime<Utc>,
    pub visitor_id: String,
    /// Per-visitor session sequence number assigned upstream.
    pub session_number: i64,
    pub country: Option<String>,
    pub device: Option<String>,
    pub language: Option<String>,
    pub referrer: Option<String>,
    pub page_path: Option<String>,
    pub page_title: Option<String>,
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl RawEvent {
    /// Read a string-valued parameter; empty strings count as absent.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Read a numeric parameter, accepting both JSON numbers and numeric strings.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        match self.params.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Compute the deterministic session ID for a (visitor, session number) pair.
///
/// `session_id = sha256(visitor_id + ":" + session_number)[0:16]`
pub fn session_id(visitor_id: &str, session_number: i64) -> String {
    let input = format!("{}:{}", visitor_id, session_number);
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..8])
}

/// One reconstructed session — the reduction of every raw event sharing a
/// (visitor_id, session_number) key on one sync day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub visitor_id: String,
    pub session_number: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Free-text country name as reported upstream.
    pub country: Option<String>,
    pub country_iso2: Option<String>,
    pub country_iso3: Option<String>,
    pub device: Option<String>,
    pub language: Option<String>,
    pub referrer: Option<String>,
    pub is_returning: bool,
    pub total_events: i64,
    pub total_pageviews: i64,
    pub duration_seconds: i64,
}

/// Immutable pageview fact row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageviewRecord {
    pub event_ts: DateTime<Utc>,
    pub session_id: String,
    pub visitor_id: String,
    pub page_path: String,
    pub page_title: Option<String>,
    pub referrer: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoEventName {
    Start,
    Pause,
    Progress,
    Complete,
}

impl VideoEventName {
    /// Map a raw warehouse event name onto the engagement taxonomy.
    /// Returns `None` for every non-video event.
    pub fn from_raw(event_name: &str) -> Option<Self> {
        match event_name {
            "video_start" => Some(Self::Start),
            "video_pause" => Some(Self::Pause),
            "video_progress" => Some(Self::Progress),
            "video_complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Progress => "progress",
            Self::Complete => "complete",
        }
    }
}

/// Immutable video-engagement fact row. Rows without a resolved `video_id`
/// never reach this type — they are dropped (and counted) at extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEventRecord {
    pub event_name: VideoEventName,
    pub event_ts: DateTime<Utc>,
    pub session_id: String,
    pub visitor_id: String,
    pub video_id: String,
    pub video_title: Option<String>,
    pub gallery: Option<String>,
    pub player: Option<String>,
    pub locale: Option<String>,
    pub current_time_seconds: Option<f64>,
    pub progress_percent: Option<f64>,
    pub watch_time_seconds: Option<f64>,
}

/// Immutable CTA-click fact row; requires a resolved `cta_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtaClickRecord {
    pub event_ts: DateTime<Utc>,
    pub session_id: String,
    pub visitor_id: String,
    pub page_path: Option<String>,
    pub cta_id: String,
    pub locale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_deterministic() {
        let a = session_id("visitor_1", 3);
        let b = session_id("visitor_1", 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, session_id("visitor_1", 4));
        assert_ne!(a, session_id("visitor_2", 3));
    }

    #[test]
    fn param_helpers_ignore_empty_and_coerce_numbers() {
        let mut params = serde_json::Map::new();
        params.insert("video_id".into(), serde_json::json!("vid_1"));
        params.insert("blank".into(), serde_json::json!("  "));
        params.insert("pct".into(), serde_json::json!(42.5));
        params.insert("pct_str".into(), serde_json::json!("17"));
        let event = RawEvent {
            event_name: "video_progress".into(),
            event_ts: Utc::now(),
            visitor_id: "v".into(),
            session_number: 1,
            country: None,
            device: None,
            language: None,
            referrer: None,
            page_path: None,
            page_title: None,
            params,
        };
        assert_eq!(event.param_str("video_id"), Some("vid_1"));
        assert_eq!(event.param_str("blank"), None);
        assert_eq!(event.param_str("missing"), None);
        assert_eq!(event.param_f64("pct"), Some(42.5));
        assert_eq!(event.param_f64("pct_str"), Some(17.0));
    }

    #[test]
    fn video_event_name_mapping() {
        assert_eq!(
            VideoEventName::from_raw("video_start"),
            Some(VideoEventName::Start)
        );
        assert_eq!(
            VideoEventName::from_raw("video_complete"),
            Some(VideoEventName::Complete)
        );
        assert_eq!(VideoEventName::from_raw("page_view"), None);
        assert_eq!(VideoEventName::Progress.as_str(), "progress");
    }
}
