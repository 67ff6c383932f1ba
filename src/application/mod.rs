//! Application layer.
//!
//! Range resolution, dialect expressions and the three metric aggregators,
//! wired together by [`resolve::MetricContext`].

pub mod dialect;
pub mod metric;
pub mod partition;
pub mod range;
pub mod resolve;
pub mod trend;
pub mod value;

pub use dialect::{DialectRegistry, TrendDateDialect};
pub use metric::{
    Describe, Metric, MetricMeta, MetricRequest, PartitionMetric, TrendMetric, ValueMetric,
};
pub use partition::PartitionAggregator;
pub use range::{BuiltinRange, RangeResolver};
pub use resolve::MetricContext;
pub use trend::TrendAggregator;
pub use value::{percent_change, ValueAggregator};
