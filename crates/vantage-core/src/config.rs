use chrono_tz::Tz;

/// Pipeline configuration, read once from the environment at startup.
///
/// The warehouse and analytics store locations are required — a scheduler
/// invoking the sync binary without them must see a non-zero exit.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the raw event warehouse database (read-only).
    pub warehouse_path: String,
    /// Path to the analytics store database (upsert target).
    pub analytics_path: String,
    /// IANA name of the single fixed business timezone.
    pub timezone: String,
    /// Upsert batch size per transaction.
    pub batch_size: usize,
    pub duckdb_memory_limit: String,
}

pub const DEFAULT_TIMEZONE: &str = "Europe/Warsaw";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            warehouse_path: std::env::var("VANTAGE_WAREHOUSE_PATH")
                .map_err(|_| "VANTAGE_WAREHOUSE_PATH is required".to_string())?,
            analytics_path: std::env::var("VANTAGE_ANALYTICS_PATH")
                .map_err(|_| "VANTAGE_ANALYTICS_PATH is required".to_string())?,
            timezone: std::env::var("VANTAGE_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
            batch_size: std::env::var("VANTAGE_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            duckdb_memory_limit: std::env::var("VANTAGE_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }

    /// Parse the configured business timezone. A bad IANA name is a hard
    /// configuration error, not a silent UTC fallback.
    pub fn business_tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("invalid VANTAGE_TIMEZONE {:?}", self.timezone))
    }
}
