use chrono::{DateTime, NaiveDate, Utc};

use vantage_core::records::{PageviewRecord, SessionRecord, VideoEventName, VideoEventRecord};
use vantage_core::sync::{DatasetCounts, RunOutcome, SyncStatus};
use vantage_duckdb::AnalyticsDb;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).expect("ts").with_timezone(&Utc)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

fn session(visitor: &str, number: i64) -> SessionRecord {
    SessionRecord {
        session_id: vantage_core::records::session_id(visitor, number),
        visitor_id: visitor.to_string(),
        session_number: number,
        first_seen: ts("2025-01-05T10:00:00Z"),
        last_seen: ts("2025-01-05T10:10:00Z"),
        country: Some("Poland".into()),
        country_iso2: Some("PL".into()),
        country_iso3: Some("POL".into()),
        device: Some("desktop".into()),
        language: Some("pl".into()),
        referrer: None,
        is_returning: false,
        total_events: 5,
        total_pageviews: 3,
        duration_seconds: 600,
    }
}

fn pageview(visitor: &str, at: &str, path: &str) -> PageviewRecord {
    PageviewRecord {
        event_ts: ts(at),
        session_id: vantage_core::records::session_id(visitor, 1),
        visitor_id: visitor.to_string(),
        page_path: path.to_string(),
        page_title: None,
        referrer: None,
        locale: Some("en".into()),
    }
}

#[tokio::test]
async fn session_upsert_latest_aggregate_wins() {
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let sync_date = date("2025-01-05");

    let first = session("v1", 1);
    assert_eq!(
        db.load_sessions(&[first.clone()], sync_date).await.expect("load"),
        1
    );

    // Rerun with a fuller aggregate for the same key: the row is replaced,
    // never duplicated.
    let mut updated = first;
    updated.total_events = 9;
    updated.total_pageviews = 6;
    updated.duration_seconds = 1200;
    db.load_sessions(&[updated], sync_date).await.expect("reload");

    let conn = db.conn_for_test().await;
    let (count, total_events): (i64, i64) = conn
        .prepare("SELECT COUNT(*), MAX(total_events) FROM sessions")
        .expect("prepare")
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("row");
    assert_eq!(count, 1);
    assert_eq!(total_events, 9);
}

#[tokio::test]
async fn fact_loads_skip_conflicts_on_rerun() {
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let rows = vec![
        pageview("v1", "2025-01-05T10:00:00Z", "/"),
        pageview("v1", "2025-01-05T10:01:00Z", "/videos"),
        pageview("v2", "2025-01-05T11:00:00Z", "/"),
    ];

    assert_eq!(db.load_pageviews(&rows).await.expect("load"), 3);
    // Idempotent rerun: conflict keys match, nothing is written.
    assert_eq!(db.load_pageviews(&rows).await.expect("reload"), 0);

    let conn = db.conn_for_test().await;
    let count: i64 = conn
        .prepare("SELECT COUNT(*) FROM pageviews")
        .expect("prepare")
        .query_row([], |row| row.get(0))
        .expect("row");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn video_event_conflict_key_distinguishes_event_names() {
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let base = VideoEventRecord {
        event_name: VideoEventName::Start,
        event_ts: ts("2025-01-05T10:00:00Z"),
        session_id: vantage_core::records::session_id("v1", 1),
        visitor_id: "v1".into(),
        video_id: "vid_1".into(),
        video_title: Some("Launch".into()),
        gallery: None,
        player: None,
        locale: Some("en".into()),
        current_time_seconds: Some(0.0),
        progress_percent: Some(0.0),
        watch_time_seconds: None,
    };
    let mut complete = base.clone();
    complete.event_name = VideoEventName::Complete;

    // Same timestamp, visitor and video — different event names are
    // different facts.
    assert_eq!(
        db.load_video_events(&[base, complete]).await.expect("load"),
        2
    );
}

#[tokio::test]
async fn batching_loads_every_row() {
    // Batch size 2 with 5 rows: three transactions, all rows present.
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 2).expect("db");
    let rows: Vec<PageviewRecord> = (0..5)
        .map(|i| pageview("v1", &format!("2025-01-05T10:0{i}:00Z"), "/"))
        .collect();
    assert_eq!(db.load_pageviews(&rows).await.expect("load"), 5);
}

#[tokio::test]
async fn sync_run_transitions_once_to_terminal_state() {
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let run_id = db.start_run(date("2025-01-05")).await.expect("start");

    let run = db.get_run(&run_id).await.expect("get");
    assert_eq!(run.status, SyncStatus::Running);
    assert!(run.end_time.is_none());

    let outcome = RunOutcome {
        status: SyncStatus::Completed,
        counts: DatasetCounts {
            sessions: 10,
            pageviews: 40,
            video_events: 12,
            cta_clicks: 3,
        },
        errors_count: 0,
        error_details: None,
        geo_unresolved: 2,
    };
    db.finish_run(&run_id, &outcome).await.expect("finish");

    let run = db.get_run(&run_id).await.expect("get");
    assert_eq!(run.status, SyncStatus::Completed);
    assert!(run.end_time.is_some());
    assert_eq!(run.counts.pageviews, 40);
    assert_eq!(run.geo_unresolved, 2);

    // Terminal means terminal: a second completion attempt is rejected.
    assert!(db.finish_run(&run_id, &outcome).await.is_err());
}

#[tokio::test]
async fn reruns_for_the_same_date_get_their_own_rows() {
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let a = db.start_run(date("2025-01-05")).await.expect("start a");
    let b = db.start_run(date("2025-01-05")).await.expect("start b");
    assert_ne!(a, b);

    let conn = db.conn_for_test().await;
    let count: i64 = conn
        .prepare("SELECT COUNT(*) FROM sync_runs WHERE sync_date = '2025-01-05'")
        .expect("prepare")
        .query_row([], |row| row.get(0))
        .expect("row");
    assert_eq!(count, 2);
}
