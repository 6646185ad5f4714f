use std::sync::Arc;

use anyhow::Result;
use chrono_tz::Tz;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use crate::schema::init_sql;

/// The DuckDB analytics store.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection sits behind `Arc<Mutex<_>>` so the async
/// runtime serialises loader batches while the struct stays cheaply cloneable
/// for the report query layer.
///
/// Memory and thread limits are enforced by [`init_sql`] at open time;
/// the memory limit comes from `Config.duckdb_memory_limit`.
#[derive(Clone)]
pub struct AnalyticsDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
    /// The single fixed business timezone every date window is resolved in.
    pub(crate) tz: Tz,
    pub(crate) batch_size: usize,
}

impl AnalyticsDb {
    /// Open (or create) the analytics store at `path` and run the idempotent
    /// schema init.
    pub fn open(path: &str, memory_limit: &str, tz: Tz, batch_size: usize) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            path,
            memory_limit,
            timezone = %tz,
            batch_size,
            "analytics store opened"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tz,
            batch_size,
        })
    }

    /// Open an **in-memory** analytics store. Intended for tests only —
    /// data is discarded when the struct is dropped.
    pub fn open_in_memory(tz: Tz, batch_size: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tz,
            batch_size,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// `SELECT 1` liveness check; errors if the store file is locked or the
    /// disk is full.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code should use the typed methods in this crate.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
