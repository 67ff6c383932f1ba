//! Single-number aggregation compared against the preceding window.

use tracing::debug;

use super::metric::{
    Describe, HasRangeSelection, HasRounding, Metric, MetricRequest, ValueMetric,
};
use super::range::RangeResolver;
use super::resolve::MetricContext;
use crate::domain::{DateRange, MetricResult, RangedDescriptor, Rounding, RoundingMode, ValueResult};
use crate::error::Result;
use crate::port::outbound::source::{Between, DataSource, ScalarQuery};

/// Percent change from `previous` to `current`, rounded to two places.
///
/// Both zero is no change. When either side is zero the other side is the
/// whole delta, so the change is 100% in the direction of `current`.
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if current == 0.0 && previous == 0.0 {
        return 0.0;
    }
    let ratio = if current == 0.0 || previous == 0.0 {
        1.0
    } else {
        (previous - current) / previous
    };
    let magnitude = Rounding::new(2, RoundingMode::HalfUp).apply(ratio.abs() * 100.0);
    if current < previous {
        -magnitude
    } else {
        magnitude
    }
}

/// Computes [`ValueResult`]s for [`ValueMetric`]s.
pub struct ValueAggregator<'a> {
    source: &'a dyn DataSource,
    resolver: &'a RangeResolver,
}

impl<'a> ValueAggregator<'a> {
    pub fn new(source: &'a dyn DataSource, resolver: &'a RangeResolver) -> Self {
        Self { source, resolver }
    }

    /// Aggregate `metric` over the selected window and the one before it.
    /// Without a window a single unconstrained aggregate is reported and
    /// there is no comparison.
    ///
    /// # Errors
    /// Propagates range, calendar and data source errors.
    pub fn aggregate(&self, metric: &ValueMetric, requested: Option<&str>) -> Result<ValueResult> {
        let window = metric.select_window(self.resolver, metric.meta.timezone, requested, None)?;

        let column = metric
            .column
            .clone()
            .unwrap_or_else(|| self.source.key_column().to_string());
        let date_column = metric
            .date_column
            .clone()
            .unwrap_or_else(|| self.source.created_at_column().to_string());

        let query = |between: Option<Between>| -> Result<f64> {
            let value = self.source.aggregate(&ScalarQuery {
                function: metric.function,
                column: column.clone(),
                between,
            })?;
            Ok(metric.round(value))
        };
        let bounded = |range: &DateRange| {
            let (start, end) = range.to_utc_bounds();
            Some(Between {
                column: date_column.clone(),
                start,
                end,
            })
        };

        let (current, previous) = match &window.range {
            None => (query(None)?, None),
            Some(range) => {
                let current = query(bounded(range))?;
                let previous = query(bounded(&range.prev()?))?;
                (current, Some(previous))
            }
        };

        let percent_changed = previous.map(|previous| percent_change(current, previous));
        debug!(
            metric = %metric.uri_key(),
            current,
            previous = ?previous,
            percent_changed = ?percent_changed,
            "Aggregated value"
        );

        Ok(ValueResult {
            descriptor: metric.descriptor(),
            value: metric.transformed(current),
            previous: previous.map(|previous| metric.transformed(previous)),
            percent_changed,
            positive_change: percent_changed.map_or(true, |change| change >= 0.0),
            prefix: metric.prefix.clone(),
            suffix: metric.suffix.clone(),
            zero_result: metric.zero_result,
            ranged: RangedDescriptor {
                selected_range_key: window.key,
                range: window.range,
                ranges: metric.range_options(),
            },
        })
    }
}

impl Metric for ValueMetric {
    fn calculate(&self, ctx: &MetricContext, request: &MetricRequest) -> Result<MetricResult> {
        ValueAggregator::new(ctx.source.as_ref(), &ctx.resolver)
            .aggregate(self, request.range())
            .map(MetricResult::Value)
    }
}
