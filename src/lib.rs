pub mod dashboard;
pub mod db;
pub mod ingest;
pub mod store;
pub mod telemetry;
