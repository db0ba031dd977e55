use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Count, Timing};

/// Closed window contents, stamped at flush time. Handed off to the store as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub counts: HashMap<String, Count>,
    pub timings: HashMap<String, Timing>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.timings.is_empty()
    }
}
