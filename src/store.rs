use std::future::Future;

use thiserror::Error;

use crate::telemetry::{Reading, StatusSnapshot};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored {table} row: {detail}")]
    InvalidRow { table: &'static str, detail: String },
}

/// Append-only store of completed readings.
pub trait ReadingStore {
    fn save_reading(
        &self,
        reading: &Reading,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn latest_reading(
        &self,
    ) -> impl Future<Output = Result<Option<Reading>, StorageError>> + Send;

    /// Most recent first.
    fn recent_readings(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, StorageError>> + Send;
}

/// Append-only store of per-line status snapshots.
pub trait StatusStore {
    fn save_status(
        &self,
        snapshot: &StatusSnapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn latest_status(
        &self,
    ) -> impl Future<Output = Result<Option<StatusSnapshot>, StorageError>> + Send;

    /// Most recent first.
    fn recent_statuses(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StatusSnapshot>, StorageError>> + Send;
}
