// Domain models: events, window accumulators, snapshots, query results

mod aggregate;
mod event;
mod query;
mod snapshot;

pub use aggregate::{Count, Timing, Window};
pub use event::{DecodeError, Event, EventKind};
pub use query::{Interval, IntervalError, ResultRow, Results};
pub use snapshot::Snapshot;
