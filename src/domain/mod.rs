//! Storage-agnostic calendar and result types.

pub mod aggregate;
pub mod bucket;
pub mod calendar;
pub mod error;
pub mod interval;
pub mod range;
pub mod result;
pub mod rounding;

pub use aggregate::AggregateFunction;
pub use bucket::{bucket_key, bucket_label, parse_bucket_key, TrendUnit};
pub use error::DomainError;
pub use interval::{Interval, IntervalUnit};
pub use range::DateRange;
pub use result::{
    MetricDescriptor, MetricResult, PartitionResult, RangeOption, RangedDescriptor, Series,
    TrendResult, ValueResult,
};
pub use rounding::{Rounding, RoundingMode};
