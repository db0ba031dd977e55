// Composite bucket keys: (name, year, month, day, hour, minute, second).
// Writes always use all six calendar components; queries truncate to the selected depth
// and the store groups rows by that prefix.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use super::Granularity;
use crate::models::{Interval, ResultRow, Results};

/// Calendar components of a full-resolution key.
pub const KEY_COMPONENTS: usize = 6;

/// Store column for each calendar component, in key order.
pub const KEY_COLUMNS: [&str; KEY_COMPONENTS] = ["year", "month", "day", "hour", "minute", "second"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BucketError {
    #[error("bucket key must have 1..={KEY_COMPONENTS} components, got {0}")]
    Depth(usize),
    #[error("bucket key {0:?} is not a valid calendar time")]
    InvalidTime(Vec<i32>),
}

/// Ordered key. Derived `Ord` compares the name first, then components lexicographically,
/// which matches the store's row-value ordering for keys of equal depth.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    name: String,
    parts: Vec<i32>,
}

impl BucketKey {
    pub fn new(name: impl Into<String>, parts: Vec<i32>) -> Result<Self, BucketError> {
        if parts.is_empty() || parts.len() > KEY_COMPONENTS {
            return Err(BucketError::Depth(parts.len()));
        }
        Ok(Self {
            name: name.into(),
            parts,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parts(&self) -> &[i32] {
        &self.parts
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// Drop trailing components beyond `depth` (the year is always kept).
    /// A shallower key is returned unchanged.
    pub fn truncate(&self, depth: usize) -> Self {
        let depth = depth.clamp(1, self.parts.len());
        Self {
            name: self.name.clone(),
            parts: self.parts[..depth].to_vec(),
        }
    }

    /// Bucket start time. Missing components default to the start of their unit.
    pub fn decode(&self) -> Result<DateTime<Utc>, BucketError> {
        let invalid = || BucketError::InvalidTime(self.parts.clone());
        let part = |i: usize, default: u32| -> Result<u32, BucketError> {
            match self.parts.get(i) {
                Some(v) => u32::try_from(*v).map_err(|_| invalid()),
                None => Ok(default),
            }
        };
        let year = self.parts[0];
        Utc.with_ymd_and_hms(
            year,
            part(1, 1)?,
            part(2, 1)?,
            part(3, 0)?,
            part(4, 0)?,
            part(5, 0)?,
        )
        .single()
        .ok_or_else(invalid)
    }
}

/// Full-resolution key for a write.
pub fn encode(name: &str, timestamp: DateTime<Utc>) -> BucketKey {
    BucketKey {
        name: name.to_string(),
        parts: vec![
            timestamp.year(),
            timestamp.month() as i32,
            timestamp.day() as i32,
            timestamp.hour() as i32,
            timestamp.minute() as i32,
            timestamp.second() as i32,
        ],
    }
}

/// Truncate `timestamp` to the start of its bucket at `granularity`.
pub fn truncate(timestamp: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    // A key produced by `encode` always decodes.
    encode("", timestamp)
        .truncate(granularity.depth())
        .decode()
        .unwrap_or(timestamp)
}

/// Inclusive start/end keys for a grouped range scan, both at `granularity.depth()`.
pub fn range_keys(name: &str, interval: &Interval, granularity: Granularity) -> (BucketKey, BucketKey) {
    let depth = granularity.depth();
    (
        encode(name, interval.start()).truncate(depth),
        encode(name, interval.end()).truncate(depth),
    )
}

/// One group from a grouped range scan: key prefix plus the sum and number of matched values.
/// The sum is floating point so a bucket whose values exceed `i64` still averages.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub key: BucketKey,
    pub sum: f64,
    pub count: i64,
}

/// Turn grouped scan rows into an ascending series of averages.
/// Rows for another name, of the wrong depth, outside `[start, end]`, or not decodable are dropped.
pub fn collect_results(
    name: &str,
    start: &BucketKey,
    end: &BucketKey,
    rows: impl IntoIterator<Item = GroupedRow>,
) -> Results {
    let mut out: Vec<ResultRow> = rows
        .into_iter()
        .filter_map(|row| {
            if row.key.name() != name
                || row.key.depth() != start.depth()
                || row.key.parts() < start.parts()
                || row.key.parts() > end.parts()
                || row.count <= 0
            {
                tracing::debug!(key = ?row.key, "dropping out-of-range bucket row");
                return None;
            }
            match row.key.decode() {
                Ok(time) => Some(ResultRow {
                    time,
                    value: row.sum / row.count as f64,
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "dropping undecodable bucket row");
                    None
                }
            }
        })
        .collect();
    out.sort_by_key(|r| r.time);
    Results {
        name: name.to_string(),
        rows: out,
    }
}
