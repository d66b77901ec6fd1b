//! Analysis modules.
//!
//! Date bucketing and the per-bucket, per-point aggregation loop.

pub mod aggregator;
pub mod buckets;

pub use aggregator::{AggregationSettings, WindowAggregator};
pub use buckets::generate_buckets;
