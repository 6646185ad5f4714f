//! Read-only client for the daily-partitioned raw event warehouse.
//!
//! One partition per calendar day, named `raw_events_YYYYMMDD`. The client
//! only ever touches a single partition per run; a missing partition is
//! fatal to that day's sync and nothing else.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use vantage_core::error::SyncError;
use vantage_core::records::RawEvent;
use vantage_core::store::EventWarehouse;

use crate::schema::TS_FORMAT;

pub struct WarehouseClient {
    conn: Arc<Mutex<Connection>>,
}

/// Partition table name for one calendar day.
pub fn partition_table(date: NaiveDate) -> String {
    format!("raw_events_{}", date.format("%Y%m%d"))
}

impl WarehouseClient {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!(path, "warehouse opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory warehouse for tests; partitions are seeded via
    /// [`WarehouseClient::seed_partition`].
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn partition_exists(&self, table: &str) -> Result<bool, SyncError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?1")
            .and_then(|mut stmt| stmt.query_row(duckdb::params![table], |row| row.get(0)))
            .map_err(|e| SyncError::MalformedPartition {
                partition: table.to_string(),
                reason: e.to_string(),
            })?;
        Ok(count > 0)
    }

    /// Create and fill one day's partition.
    ///
    /// Used by the upstream ingest tooling and by test fixtures; the sync
    /// pipeline itself never writes to the warehouse.
    pub async fn seed_partition(&self, date: NaiveDate, events: &[RawEvent]) -> Result<()> {
        let table = partition_table(date);
        let mut conn = self.conn.lock().await;
        conn.execute_batch(&format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
    event_name     VARCHAR NOT NULL,
    event_ts       TIMESTAMP NOT NULL,
    visitor_id     VARCHAR NOT NULL,
    session_number BIGINT NOT NULL,
    country        VARCHAR,
    device         VARCHAR,
    language       VARCHAR,
    referrer       VARCHAR,
    page_path      VARCHAR,
    page_title     VARCHAR,
    params         VARCHAR NOT NULL DEFAULT '{{}}'
)"#
        ))?;

        let tx = conn.transaction()?;
        for event in events {
            tx.execute(
                &format!(
                    "INSERT INTO {table} (event_name, event_ts, visitor_id, session_number, \
                     country, device, language, referrer, page_path, page_title, params) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                duckdb::params![
                    event.event_name,
                    event.event_ts.format(TS_FORMAT).to_string(),
                    event.visitor_id,
                    event.session_number,
                    event.country,
                    event.device,
                    event.language,
                    event.referrer,
                    event.page_path,
                    event.page_title,
                    serde_json::Value::Object(event.params.clone()).to_string(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Intermediate row shape: everything as stored, parsed into [`RawEvent`]
/// outside the row-mapping closure so decode failures surface as
/// [`SyncError::MalformedPartition`] instead of a generic driver error.
struct StoredRow {
    event_name: String,
    event_ts: String,
    visitor_id: String,
    session_number: i64,
    country: Option<String>,
    device: Option<String>,
    language: Option<String>,
    referrer: Option<String>,
    page_path: Option<String>,
    page_title: Option<String>,
    params: String,
}

fn decode_row(row: StoredRow, table: &str) -> Result<RawEvent, SyncError> {
    let malformed = |reason: String| SyncError::MalformedPartition {
        partition: table.to_string(),
        reason,
    };
    let event_ts = chrono::NaiveDateTime::parse_from_str(&row.event_ts, TS_FORMAT)
        .map_err(|e| malformed(format!("bad event_ts {:?}: {e}", row.event_ts)))?
        .and_utc();
    let params = match serde_json::from_str(&row.params) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => return Err(malformed("params is not a JSON object".into())),
        Err(e) => return Err(malformed(format!("bad params JSON: {e}"))),
    };
    Ok(RawEvent {
        event_name: row.event_name,
        event_ts,
        visitor_id: row.visitor_id,
        session_number: row.session_number,
        country: row.country,
        device: row.device,
        language: row.language,
        referrer: row.referrer,
        page_path: row.page_path,
        page_title: row.page_title,
        params,
    })
}

#[async_trait::async_trait]
impl EventWarehouse for WarehouseClient {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<RawEvent>, SyncError> {
        let table = partition_table(date);
        if !self.partition_exists(&table).await? {
            return Err(SyncError::MissingPartition(date));
        }

        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT event_name, CAST(event_ts AS VARCHAR), visitor_id, session_number, \
             country, device, language, referrer, page_path, page_title, params \
             FROM {table} ORDER BY event_ts, event_name"
        );
        let stored: Vec<StoredRow> = conn
            .prepare(&sql)
            .and_then(|mut stmt| {
                let rows = stmt.query_map([], |row| {
                    Ok(StoredRow {
                        event_name: row.get(0)?,
                        event_ts: row.get(1)?,
                        visitor_id: row.get(2)?,
                        session_number: row.get(3)?,
                        country: row.get(4)?,
                        device: row.get(5)?,
                        language: row.get(6)?,
                        referrer: row.get(7)?,
                        page_path: row.get(8)?,
                        page_title: row.get(9)?,
                        params: row.get(10)?,
                    })
                })?;
                rows.collect()
            })
            .map_err(|e| SyncError::MalformedPartition {
                partition: table.clone(),
                reason: e.to_string(),
            })?;

        stored
            .into_iter()
            .map(|row| decode_row(row, &table))
            .collect()
    }
}
