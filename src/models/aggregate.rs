// Per-metric accumulators and the flush window that owns them.
// Sums wrap on overflow; no checking is done.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Event, EventKind, Snapshot};

/// Sum of all count values seen for a metric in one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub value: i64,
}

impl Count {
    pub fn reduce(&mut self, value: i64) {
        self.value = self.value.wrapping_add(value);
    }
}

/// Timing statistics for a metric in one window.
/// With `count == 0`, `min`/`max` hold sentinels so the first value sets both bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub sum: i64,
    pub count: i64,
    pub min: i64,
    pub max: i64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sum: 0,
            count: 0,
            min: i64::MAX,
            max: i64::MIN,
        }
    }
}

impl Timing {
    pub fn reduce(&mut self, value: i64) {
        self.count = self.count.wrapping_add(1);
        self.sum = self.sum.wrapping_add(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Mean of the reduced values; `None` before the first value.
    pub fn avg(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }
}

/// Accumulation state for one flush cycle. A name may carry both a count and a timing.
#[derive(Debug, Default)]
pub struct Window {
    counts: HashMap<String, Count>,
    timings: HashMap<String, Timing>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, event: &Event) {
        match event.kind {
            EventKind::Count => self
                .counts
                .entry(event.name.clone())
                .or_default()
                .reduce(event.value),
            EventKind::Timing => self
                .timings
                .entry(event.name.clone())
                .or_default()
                .reduce(event.value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.timings.is_empty()
    }

    /// Number of distinct (name, kind) accumulators.
    pub fn len(&self) -> usize {
        self.counts.len() + self.timings.len()
    }

    pub fn count(&self, name: &str) -> Option<&Count> {
        self.counts.get(name)
    }

    pub fn timing(&self, name: &str) -> Option<&Timing> {
        self.timings.get(name)
    }

    /// Close the window and stamp its contents with the flush instant.
    pub fn into_snapshot(self, timestamp: DateTime<Utc>) -> Snapshot {
        Snapshot {
            timestamp,
            counts: self.counts,
            timings: self.timings,
        }
    }
}
