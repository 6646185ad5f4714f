pub mod config;
pub mod error;
pub mod extract;
pub mod filters;
pub mod geo;
pub mod params;
pub mod records;
pub mod store;
pub mod sync;
