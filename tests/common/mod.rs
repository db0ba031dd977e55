// Shared test helpers

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chilada::bucket::{self, BucketKey, GroupedRow};
use chilada::models::Snapshot;
use chilada::store::{Store, StoreError};
use chrono::{DateTime, TimeZone, Utc};

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// In-memory store: keeps every written snapshot and answers grouped scans from them.
#[derive(Default)]
pub struct RecordingStore {
    snapshots: Mutex<Vec<Snapshot>>,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails with a database error.
    pub fn failing() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        let snapshots = self.snapshots.lock().unwrap();
        let mut names: Vec<String> = snapshots
            .iter()
            .flat_map(|s| s.counts.keys().chain(s.timings.keys()).cloned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn scan_counts(
        &self,
        start: &BucketKey,
        end: &BucketKey,
    ) -> Result<Vec<GroupedRow>, StoreError> {
        let depth = start.depth();
        let mut groups: BTreeMap<Vec<i32>, (f64, i64)> = BTreeMap::new();
        for snapshot in self.snapshots.lock().unwrap().iter() {
            let Some(count) = snapshot.counts.get(start.name()) else {
                continue;
            };
            let key = bucket::encode(start.name(), snapshot.timestamp).truncate(depth);
            if key.parts() < start.parts() || key.parts() > end.parts() {
                continue;
            }
            let group = groups.entry(key.parts().to_vec()).or_default();
            group.0 += count.value as f64;
            group.1 += 1;
        }
        groups
            .into_iter()
            .map(|(parts, (sum, count))| {
                Ok(GroupedRow {
                    key: BucketKey::new(start.name(), parts)?,
                    sum,
                    count,
                })
            })
            .collect()
    }
}
