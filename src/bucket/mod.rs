// Time-bucketed key protocol shared by the store's write and read paths.

mod codec;
mod granularity;

pub use codec::{
    BucketError, BucketKey, GroupedRow, KEY_COLUMNS, KEY_COMPONENTS, collect_results, encode,
    range_keys, truncate,
};
pub use granularity::Granularity;
