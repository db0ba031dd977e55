// Snapshot persistence and time-bucketed reads.
// The aggregator and the HTTP routes receive the store as `Arc<dyn Store>`.

mod sqlite;

use async_trait::async_trait;

use crate::bucket::{self, BucketError, BucketKey, Granularity, GroupedRow};
use crate::models::{Interval, Results, Snapshot};

pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad bucket key: {0}")]
    Bucket(#[from] BucketError),
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Prepare the backing store (schema, indexes). Called once at startup.
    async fn open(&self) -> Result<(), StoreError>;

    /// Persist one snapshot under its full-resolution keys. An empty snapshot writes nothing.
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Known metric names (counts and timings), sorted, without duplicates.
    async fn names(&self) -> Result<Vec<String>, StoreError>;

    /// Grouped range scan over count values: one row per distinct key prefix of
    /// `start.depth()` components within `[start, end]`, carrying the sum and number of values.
    async fn scan_counts(
        &self,
        start: &BucketKey,
        end: &BucketKey,
    ) -> Result<Vec<GroupedRow>, StoreError>;

    /// Series for `name` over `interval`, at a granularity chosen from the interval length.
    async fn read(&self, name: &str, interval: Interval) -> Result<Results, StoreError> {
        let granularity = Granularity::select(&interval);
        let (start, end) = bucket::range_keys(name, &interval, granularity);
        let rows = self.scan_counts(&start, &end).await?;
        Ok(bucket::collect_results(name, &start, &end, rows))
    }
}
