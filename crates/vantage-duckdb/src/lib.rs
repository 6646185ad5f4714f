pub mod backend;
pub mod load;
pub mod queries;
pub mod schema;
pub mod sync_runs;
pub mod warehouse;

pub use backend::AnalyticsDb;
pub use warehouse::WarehouseClient;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `vantage_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
