//! Append-only persistence of snapshots and raw listings

mod csv_snapshot_store;

pub use csv_snapshot_store::{CsvSnapshotStore, RawListingRow, SummaryRow};

use crate::domain::snapshot::Snapshot;
use crate::shared::errors::StorageError;

/// Sink for completed analysis runs
pub trait SnapshotStore: Send + Sync {
    /// Append one summary row per market and one raw row per fetched listing
    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StorageError>;
}
