// Read-side types: requested interval and the time series returned for it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("interval end {end} is before start {start}")]
    Reversed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("timestamp {0} is out of range")]
    OutOfRange(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if end < start {
            return Err(IntervalError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Interval from Unix seconds (as sent by the HTTP API).
    pub fn from_unix(start: i64, end: i64) -> Result<Self, IntervalError> {
        let start = DateTime::from_timestamp(start, 0).ok_or(IntervalError::OutOfRange(start))?;
        let end = DateTime::from_timestamp(end, 0).ok_or(IntervalError::OutOfRange(end))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One point: bucket start time and the average of the values grouped into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Time series for one metric, ascending by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub name: String,
    pub rows: Vec<ResultRow>,
}
