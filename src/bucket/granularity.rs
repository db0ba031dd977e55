// Query resolution: the longer the requested span, the coarser the bucket.
// Keeps the number of returned points bounded regardless of interval length.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::Interval;

const HOUR_SECS: i64 = 60 * 60;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Calendar resolution of a bucket, coarsest first (`Month < Day < ... < Second`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Year + month.
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// Checked top to bottom, first match wins. Anything shorter falls through to `Second`.
const THRESHOLDS: [(i64, Granularity); 4] = [
    (365 * DAY_SECS, Granularity::Month),
    (29 * DAY_SECS, Granularity::Day),
    (DAY_SECS, Granularity::Hour),
    (HOUR_SECS, Granularity::Minute),
];

impl Granularity {
    pub const FINEST: Granularity = Granularity::Second;

    pub fn select(interval: &Interval) -> Self {
        Self::for_duration(interval.duration())
    }

    pub fn for_duration(duration: Duration) -> Self {
        let secs = duration.num_seconds();
        THRESHOLDS
            .iter()
            .find(|(min_secs, _)| secs >= *min_secs)
            .map(|(_, g)| *g)
            .unwrap_or(Self::FINEST)
    }

    /// Number of calendar components a key keeps at this granularity.
    pub fn depth(self) -> usize {
        match self {
            Granularity::Month => 2,
            Granularity::Day => 3,
            Granularity::Hour => 4,
            Granularity::Minute => 5,
            Granularity::Second => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundaries() {
        let g = |secs: i64| Granularity::for_duration(Duration::seconds(secs));
        assert_eq!(g(0), Granularity::Second);
        assert_eq!(g(HOUR_SECS - 1), Granularity::Second);
        assert_eq!(g(HOUR_SECS), Granularity::Minute);
        assert_eq!(g(DAY_SECS - 1), Granularity::Minute);
        assert_eq!(g(DAY_SECS), Granularity::Hour);
        assert_eq!(g(29 * DAY_SECS - 1), Granularity::Hour);
        assert_eq!(g(29 * DAY_SECS), Granularity::Day);
        assert_eq!(g(365 * DAY_SECS - 1), Granularity::Day);
        assert_eq!(g(365 * DAY_SECS), Granularity::Month);
        assert_eq!(g(10 * 365 * DAY_SECS), Granularity::Month);
    }
}
