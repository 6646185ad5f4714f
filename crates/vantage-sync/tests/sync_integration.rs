use chrono::{DateTime, NaiveDate, Utc};

use vantage_core::error::SyncError;
use vantage_core::records::RawEvent;
use vantage_core::sync::SyncStatus;
use vantage_duckdb::{AnalyticsDb, WarehouseClient};
use vantage_sync::run_sync;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).expect("ts").with_timezone(&Utc)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

fn raw(
    name: &str,
    at: &str,
    visitor: &str,
    session_number: i64,
    params: serde_json::Value,
) -> RawEvent {
    let params = match params {
        serde_json::Value::Object(map) => map,
        _ => panic!("params fixture must be a JSON object"),
    };
    RawEvent {
        event_name: name.to_string(),
        event_ts: ts(at),
        visitor_id: visitor.to_string(),
        session_number,
        country: Some("usa".into()),
        device: Some("desktop".into()),
        language: Some("en".into()),
        referrer: None,
        page_path: Some("/".into()),
        page_title: Some("Home".into()),
        params,
    }
}

/// One day of traffic: a new visitor with pageviews, a full video journey
/// and a CTA click, a returning visitor, one video event missing its
/// video_id (dropped), and one unresolvable country name.
fn fixture_events() -> Vec<RawEvent> {
    let mut events = vec![
        raw("first_visit", "2025-01-15T08:00:00Z", "v1", 1, serde_json::json!({})),
        raw("page_view", "2025-01-15T08:00:01Z", "v1", 1, serde_json::json!({})),
        raw(
            "video_start",
            "2025-01-15T08:01:00Z",
            "v1",
            1,
            serde_json::json!({"video_id": "vid_a", "video_title": "Intro"}),
        ),
        raw(
            "video_progress",
            "2025-01-15T08:02:00Z",
            "v1",
            1,
            serde_json::json!({"video_id": "vid_a", "progress_percent": 50, "watch_time": 30}),
        ),
        raw(
            "video_complete",
            "2025-01-15T08:04:00Z",
            "v1",
            1,
            serde_json::json!({"video_id": "vid_a"}),
        ),
        raw(
            "cta_click",
            "2025-01-15T08:05:00Z",
            "v1",
            1,
            serde_json::json!({"cta_id": "signup"}),
        ),
        // Returning visitor: no first_visit event in the group.
        raw("page_view", "2025-01-15T12:00:00Z", "v2", 3, serde_json::json!({})),
        raw("page_view", "2025-01-15T12:01:00Z", "v2", 3, serde_json::json!({})),
        // Dropped at extraction: no video_id.
        raw(
            "video_start",
            "2025-01-15T12:02:00Z",
            "v2",
            3,
            serde_json::json!({}),
        ),
    ];
    events.push(RawEvent {
        country: Some("Atlantis".into()),
        ..raw("page_view", "2025-01-15T15:00:00Z", "v3", 1, serde_json::json!({}))
    });
    events
}

async fn table_counts(db: &AnalyticsDb) -> (i64, i64, i64, i64) {
    let conn = db.conn_for_test().await;
    let count = |table: &str| -> i64 {
        conn.prepare(&format!("SELECT COUNT(*) FROM {table}"))
            .and_then(|mut stmt| stmt.query_row([], |row| row.get(0)))
            .expect("count")
    };
    (
        count("sessions"),
        count("pageviews"),
        count("video_events"),
        count("cta_clicks"),
    )
}

#[tokio::test]
async fn full_pipeline_loads_one_day() {
    let sync_date = date("2025-01-15");
    let warehouse = WarehouseClient::open_in_memory().expect("warehouse");
    warehouse
        .seed_partition(sync_date, &fixture_events())
        .await
        .expect("seed");
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let store = vantage_duckdb::load::DayLoader {
        db: db.clone(),
        sync_date,
    };

    let report = run_sync(&warehouse, &store, sync_date).await.expect("sync");

    assert_eq!(report.status, SyncStatus::Completed);
    assert_eq!(report.counts.sessions, 3);
    assert_eq!(report.counts.pageviews, 4);
    assert_eq!(report.counts.video_events, 3);
    assert_eq!(report.counts.cta_clicks, 1);
    assert_eq!(report.stats.raw_events, 10);
    assert_eq!(report.stats.dropped_video_rows, 1);
    assert_eq!(report.stats.unresolved_countries, vec!["Atlantis".to_string()]);

    assert_eq!(table_counts(&db).await, (3, 4, 3, 1));

    let run = db.get_run(&report.run_id).await.expect("run row");
    assert_eq!(run.sync_date, sync_date);
    assert_eq!(run.status, SyncStatus::Completed);
    assert_eq!(run.counts.sessions, 3);
    assert_eq!(run.counts.pageviews, 4);
    assert_eq!(run.geo_unresolved, 1);
    assert!(run.end_time.is_some());
}

#[tokio::test]
async fn rerunning_the_same_date_changes_nothing() {
    let sync_date = date("2025-01-15");
    let warehouse = WarehouseClient::open_in_memory().expect("warehouse");
    warehouse
        .seed_partition(sync_date, &fixture_events())
        .await
        .expect("seed");
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let store = vantage_duckdb::load::DayLoader {
        db: db.clone(),
        sync_date,
    };

    let first = run_sync(&warehouse, &store, sync_date).await.expect("first");
    let after_first = table_counts(&db).await;

    let second = run_sync(&warehouse, &store, sync_date).await.expect("second");
    let after_second = table_counts(&db).await;

    assert_eq!(after_first, after_second);
    assert_eq!(second.status, SyncStatus::Completed);
    // Sessions are rewritten in place; the immutable facts all conflict away.
    assert_eq!(second.counts.sessions, first.counts.sessions);
    assert_eq!(second.counts.pageviews, 0);
    assert_eq!(second.counts.video_events, 0);
    assert_eq!(second.counts.cta_clicks, 0);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn missing_partition_fails_the_run_and_records_it() {
    let sync_date = date("2025-03-01");
    let warehouse = WarehouseClient::open_in_memory().expect("warehouse");
    let db = AnalyticsDb::open_in_memory(chrono_tz::UTC, 1000).expect("db");
    let store = vantage_duckdb::load::DayLoader {
        db: db.clone(),
        sync_date,
    };

    let err = run_sync(&warehouse, &store, sync_date)
        .await
        .expect_err("missing partition must fail");
    assert!(matches!(err, SyncError::MissingPartition(d) if d == sync_date));

    assert_eq!(table_counts(&db).await, (0, 0, 0, 0));

    let conn = db.conn_for_test().await;
    let (status, errors_count): (String, i64) = conn
        .prepare("SELECT status, errors_count FROM sync_runs WHERE sync_date = ?1")
        .and_then(|mut stmt| {
            stmt.query_row(
                vantage_duckdb::duckdb::params![sync_date.format("%Y-%m-%d").to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .expect("failed run row");
    assert_eq!(status, "failed");
    assert_eq!(errors_count, 1);
}
