// Library for the binary and integration tests

pub mod aggregator;
pub mod bucket;
pub mod config;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod store;
pub mod version;
