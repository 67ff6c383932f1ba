//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the infrastructure the metrics depend on: the
//! query engine, the result cache and the clock.

pub mod cache;
pub mod clock;
pub mod source;

pub use cache::MetricCache;
pub use clock::Clock;
pub use source::{
    Between, BucketExpression, DataSource, GroupKey, GroupedQuery, GroupedRow, ScalarQuery,
};
