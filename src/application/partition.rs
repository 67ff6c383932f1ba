//! Aggregates grouped by a plain column.

use tracing::debug;

use super::metric::{Describe, HasRounding, Metric, MetricRequest, PartitionMetric};
use super::resolve::MetricContext;
use crate::domain::{MetricResult, PartitionResult, Series};
use crate::error::Result;
use crate::port::outbound::source::{DataSource, GroupKey, GroupedQuery};

/// Computes [`PartitionResult`]s for [`PartitionMetric`]s.
pub struct PartitionAggregator<'a> {
    source: &'a dyn DataSource,
}

impl<'a> PartitionAggregator<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    /// One rounded aggregate per distinct value of the group column, in the
    /// order the engine returns them.
    ///
    /// # Errors
    /// Propagates data source errors.
    pub fn aggregate(&self, metric: &PartitionMetric) -> Result<PartitionResult> {
        let column = metric
            .column
            .clone()
            .unwrap_or_else(|| self.source.key_column().to_string());

        let rows = self.source.grouped(&GroupedQuery {
            function: metric.function,
            column,
            group: GroupKey::Column(metric.group_by.clone()),
            between: None,
        })?;

        let mut value = Series::new();
        for row in rows {
            let rounded = metric.round(row.aggregate);
            value.set(row.key, metric.transformed(rounded));
        }
        debug!(metric = %metric.uri_key(), groups = value.len(), "Aggregated partition");

        Ok(PartitionResult {
            descriptor: metric.descriptor(),
            value,
        })
    }
}

impl Metric for PartitionMetric {
    fn calculate(&self, ctx: &MetricContext, _request: &MetricRequest) -> Result<MetricResult> {
        PartitionAggregator::new(ctx.source.as_ref())
            .aggregate(self)
            .map(MetricResult::Partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::{MemoryRecord, MemorySource};
    use crate::domain::{AggregateFunction, Rounding, RoundingMode};
    use chrono::{TimeZone, Utc};

    fn record(status: &str, total: f64) -> MemoryRecord {
        MemoryRecord::at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            .label("status", status)
            .value("total", total)
    }

    #[test]
    fn groups_and_rounds_values() {
        let source = MemorySource::new().with_records([
            record("paid", 10.25),
            record("paid", 5.0),
            record("refunded", 3.333),
        ]);
        let metric = PartitionMetric::new("Revenue By Status", "status")
            .function(AggregateFunction::Sum, Some("total"))
            .with_rounding(Rounding::new(1, RoundingMode::HalfEven));
        let result = PartitionAggregator::new(&source).aggregate(&metric).unwrap();

        let entries: Vec<_> = result.value.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "paid");
        assert!((entries[0].1 - 15.2).abs() < 1e-9);
        assert!((entries[1].1 - 3.3).abs() < 1e-9);
    }

    #[test]
    fn counts_by_default() {
        let source = MemorySource::new().with_records([
            record("paid", 1.0),
            record("pending", 1.0),
            record("paid", 1.0),
        ]);
        let metric = PartitionMetric::new("Orders By Status", "status");
        let result = PartitionAggregator::new(&source).aggregate(&metric).unwrap();
        let json = serde_json::to_value(MetricResult::Partition(result)).unwrap();
        assert_eq!(json["value"]["paid"], 2.0);
        assert_eq!(json["value"]["pending"], 1.0);
        assert_eq!(json["uri_key"], "orders-by-status");
    }
}
