//! DuckDB initialization SQL for the analytics store.
//!
//! Executed once at open time via `Connection::execute_batch`. All statements
//! use `IF NOT EXISTS` so they are safe to re-run on every startup
//! (idempotent). The UNIQUE constraints below are the upsert conflict keys:
//! they are what makes re-running a day's sync duplicate-free.
//!
//! `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
//! read from `Config.duckdb_memory_limit` at the call site. Always set an
//! explicit limit — DuckDB's default (80% of system RAM) is not acceptable
//! for a scheduled batch process sharing a host.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SESSIONS (daily full-day aggregates)
-- ===========================================
-- Conflict key: session_id. Re-running a day's sync overwrites the whole
-- row — latest full-day aggregate wins.
CREATE TABLE IF NOT EXISTS sessions (
    session_id       VARCHAR PRIMARY KEY,           -- sha256(visitor_id:session_number)[0:16]
    visitor_id       VARCHAR NOT NULL,
    session_number   BIGINT NOT NULL,
    sync_date        DATE NOT NULL,
    first_seen       TIMESTAMP NOT NULL,
    last_seen        TIMESTAMP NOT NULL,
    country          VARCHAR,                       -- free-text name as reported upstream
    country_iso2     VARCHAR(2),                    -- NULL when geo resolution missed
    country_iso3     VARCHAR(3),
    device           VARCHAR,
    language         VARCHAR,
    referrer         VARCHAR,
    is_returning     BOOLEAN NOT NULL,
    total_events     INTEGER NOT NULL,
    total_pageviews  INTEGER NOT NULL,
    duration_seconds BIGINT NOT NULL
);
-- Primary report pattern: date-window scans
CREATE INDEX IF NOT EXISTS idx_sessions_first_seen
    ON sessions(first_seen);
CREATE INDEX IF NOT EXISTS idx_sessions_sync_date
    ON sessions(sync_date);
-- Geo breakdown
CREATE INDEX IF NOT EXISTS idx_sessions_country
    ON sessions(country_iso2, first_seen);

-- ===========================================
-- PAGEVIEWS (immutable facts)
-- ===========================================
-- Conflict key: (event_ts, visitor_id, page_path); first write wins.
CREATE TABLE IF NOT EXISTS pageviews (
    event_ts    TIMESTAMP NOT NULL,
    session_id  VARCHAR NOT NULL,
    visitor_id  VARCHAR NOT NULL,
    page_path   VARCHAR NOT NULL,
    page_title  VARCHAR,
    referrer    VARCHAR,
    locale      VARCHAR,
    UNIQUE (event_ts, visitor_id, page_path)
);
CREATE INDEX IF NOT EXISTS idx_pageviews_ts
    ON pageviews(event_ts);

-- ===========================================
-- VIDEO ENGAGEMENT EVENTS (immutable facts)
-- ===========================================
-- Conflict key: (event_ts, visitor_id, event_name, video_id); first write wins.
CREATE TABLE IF NOT EXISTS video_events (
    event_name           VARCHAR NOT NULL,          -- 'start' | 'pause' | 'progress' | 'complete'
    event_ts             TIMESTAMP NOT NULL,
    session_id           VARCHAR NOT NULL,
    visitor_id           VARCHAR NOT NULL,
    video_id             VARCHAR NOT NULL,
    video_title          VARCHAR,
    gallery              VARCHAR,
    player               VARCHAR,
    locale               VARCHAR,
    current_time_seconds DOUBLE,
    progress_percent     DOUBLE,
    watch_time_seconds   DOUBLE,
    UNIQUE (event_ts, visitor_id, event_name, video_id)
);
CREATE INDEX IF NOT EXISTS idx_video_events_video
    ON video_events(video_id, event_ts);
CREATE INDEX IF NOT EXISTS idx_video_events_ts
    ON video_events(event_ts);

-- ===========================================
-- CTA CLICKS (immutable facts)
-- ===========================================
-- Conflict key: (event_ts, visitor_id, cta_id); first write wins.
CREATE TABLE IF NOT EXISTS cta_clicks (
    event_ts    TIMESTAMP NOT NULL,
    session_id  VARCHAR NOT NULL,
    visitor_id  VARCHAR NOT NULL,
    page_path   VARCHAR,
    cta_id      VARCHAR NOT NULL,
    locale      VARCHAR,
    UNIQUE (event_ts, visitor_id, cta_id)
);
CREATE INDEX IF NOT EXISTS idx_cta_clicks_ts
    ON cta_clicks(event_ts);

-- ===========================================
-- SYNC RUNS (pipeline bookkeeping)
-- ===========================================
-- One row per pipeline execution (not per date: a rerun for the same
-- sync_date gets its own row, keeping recovery attempts visible).
CREATE TABLE IF NOT EXISTS sync_runs (
    id                VARCHAR PRIMARY KEY,           -- UUID v4
    sync_date         DATE NOT NULL,
    start_time        TIMESTAMP NOT NULL,
    end_time          TIMESTAMP,                     -- NULL while running
    status            VARCHAR NOT NULL,              -- 'running' | 'completed' | 'completed_with_errors' | 'failed'
    sessions_loaded   BIGINT NOT NULL DEFAULT 0,
    pageviews_loaded  BIGINT NOT NULL DEFAULT 0,
    video_events_loaded BIGINT NOT NULL DEFAULT 0,
    cta_clicks_loaded BIGINT NOT NULL DEFAULT 0,
    errors_count      BIGINT NOT NULL DEFAULT 0,
    error_details     VARCHAR,
    geo_unresolved    BIGINT NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_sync_runs_date
    ON sync_runs(sync_date, start_time DESC);
"#
    )
}

/// Timestamp format used for every TIMESTAMP bind in this crate.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
