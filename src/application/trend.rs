//! Gap-free trend aggregation.
//!
//! The aggregator builds a skeleton of zero-valued labels covering the
//! window, one per bucket, then overwrites them with the rounded values the
//! data source returned for each bucket key.

use chrono::{DateTime, Offset};
use chrono_tz::Tz;
use tracing::{debug, warn};

use super::dialect::DialectRegistry;
use super::metric::{
    Describe, HasRangeSelection, HasRounding, Metric, MetricRequest, TrendMetric,
};
use super::range::RangeResolver;
use super::resolve::MetricContext;
use crate::domain::calendar::{self, localize};
use crate::domain::{
    bucket_label, parse_bucket_key, DateRange, MetricResult, RangedDescriptor, Series,
    TrendResult, TrendUnit,
};
use crate::error::Result;
use crate::port::outbound::source::{Between, DataSource, GroupKey, GroupedQuery, GroupedRow};

/// Computes [`TrendResult`]s for [`TrendMetric`]s.
pub struct TrendAggregator<'a> {
    source: &'a dyn DataSource,
    resolver: &'a RangeResolver,
    dialects: &'a DialectRegistry,
}

impl<'a> TrendAggregator<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        resolver: &'a RangeResolver,
        dialects: &'a DialectRegistry,
    ) -> Self {
        Self {
            source,
            resolver,
            dialects,
        }
    }

    /// Aggregate `metric` over the window selected by `requested` (or the
    /// metric's defaults).
    ///
    /// # Errors
    /// Propagates range, expression, calendar and data source errors. No
    /// partial result is returned.
    pub fn aggregate(&self, metric: &TrendMetric, requested: Option<&str>) -> Result<TrendResult> {
        let tz = metric.meta.timezone;
        let unit = metric.unit;
        let now = self.resolver.clock().now_in(tz);

        let window = metric.select_window(self.resolver, tz, requested, Some(unit.as_str()))?;
        let range = window
            .range
            .as_ref()
            .map(|range| range.with_interval(unit.interval()));

        let column = metric
            .column
            .clone()
            .unwrap_or_else(|| self.source.key_column().to_string());
        let date_column = metric
            .date_column
            .clone()
            .unwrap_or_else(|| self.source.created_at_column().to_string());

        let offset_seconds = now.offset().fix().local_minus_utc();
        let bucket = self
            .dialects
            .bucket(self.source.backend(), &date_column, unit, offset_seconds)?;

        let between = range.as_ref().map(|range| {
            let (start, end) = range.to_utc_bounds();
            Between {
                column: date_column.clone(),
                start,
                end,
            }
        });

        let rows = self.source.grouped(&GroupedQuery {
            function: metric.function,
            column,
            group: GroupKey::Bucket(bucket),
            between,
        })?;

        let skeleton_start = match &range {
            Some(range) => Some(bucket_containing(range.start(), unit)?),
            None => earliest_bucket(&rows, unit, tz)?,
        };

        let mut trend = Series::new();
        if let Some(mut cursor) = skeleton_start {
            while cursor.start() <= &now {
                trend.set(
                    bucket_label(&cursor.start().naive_local(), unit, metric.twelve_hour_time),
                    0.0,
                );
                cursor = cursor.next()?;
            }
        }
        let expected = trend.len();

        for row in &rows {
            let local = parse_bucket_key(&row.key, unit)?;
            let label = bucket_label(&local, unit, metric.twelve_hour_time);
            if !trend.contains(&label) {
                warn!(
                    metric = %metric.uri_key(),
                    key = %row.key,
                    label = %label,
                    "Bucket outside the expected range; appending"
                );
            }
            trend.set(label, metric.round(row.aggregate));
        }

        trend.map_values(|value| metric.transformed(value));
        let value = trend.last().map(|(_, value)| value);

        debug!(
            metric = %metric.uri_key(),
            unit = %unit,
            buckets = trend.len(),
            expected,
            rows = rows.len(),
            "Aggregated trend"
        );

        Ok(TrendResult {
            descriptor: metric.descriptor(),
            value,
            trend,
            prefix: metric.prefix.clone(),
            suffix: metric.suffix.clone(),
            ranged: RangedDescriptor {
                selected_range_key: window.key,
                range,
                ranges: metric.range_options(),
            },
        })
    }
}

/// The one-bucket range that contains `at`, aligned to the unit boundary.
fn bucket_containing(at: &DateTime<Tz>, unit: TrendUnit) -> Result<DateRange> {
    let start = match unit {
        TrendUnit::Month => calendar::start_of_month(at)?,
        TrendUnit::Week => calendar::start_of_week(at)?,
        TrendUnit::Day => calendar::start_of_day(at)?,
        TrendUnit::Hour => calendar::start_of_hour(at)?,
        TrendUnit::Minute => calendar::start_of_minute(at)?,
    };
    Ok(DateRange::new(
        start.clone(),
        start,
        Some(unit.interval()),
    )?)
}

/// A one-bucket range at the earliest key returned, for unbounded trends.
fn earliest_bucket(rows: &[GroupedRow], unit: TrendUnit, tz: Tz) -> Result<Option<DateRange>> {
    let mut earliest = None;
    for row in rows {
        let local = parse_bucket_key(&row.key, unit)?;
        if earliest.map_or(true, |current| local < current) {
            earliest = Some(local);
        }
    }
    let Some(local) = earliest else {
        return Ok(None);
    };
    let start: DateTime<Tz> = localize(local, tz)?;
    Ok(Some(DateRange::new(
        start.clone(),
        start,
        Some(unit.interval()),
    )?))
}

impl Metric for TrendMetric {
    fn calculate(&self, ctx: &MetricContext, request: &MetricRequest) -> Result<MetricResult> {
        TrendAggregator::new(ctx.source.as_ref(), &ctx.resolver, &ctx.dialects)
            .aggregate(self, request.range())
            .map(MetricResult::Trend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::clock::FixedClock;
    use crate::adapter::outbound::memory::{MemoryRecord, MemorySource};
    use crate::domain::{AggregateFunction, Rounding, RoundingMode};
    use crate::error::{Error, ExpressionError};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn resolver() -> RangeResolver {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 15, 30, 0).unwrap();
        RangeResolver::new(Arc::new(FixedClock::new(now)))
    }

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn run(source: &MemorySource, metric: &TrendMetric, range: Option<&str>) -> Result<TrendResult> {
        let resolver = resolver();
        let dialects = DialectRegistry::new();
        TrendAggregator::new(source, &resolver, &dialects).aggregate(metric, range)
    }

    #[test]
    fn empty_source_yields_zero_filled_days() {
        let source = MemorySource::new();
        let metric = TrendMetric::new("Signups").unit(TrendUnit::Day);
        let result = run(&source, &metric, Some("30")).unwrap();

        assert_eq!(result.trend.len(), 31);
        assert!(result.trend.iter().all(|(_, value)| value == 0.0));
        assert_eq!(result.trend.labels().next(), Some("February 19, 2024"));
        assert_eq!(result.trend.last(), Some(("March 20, 2024", 0.0)));
        assert_eq!(result.value, Some(0.0));
    }

    #[test]
    fn merge_overwrites_zeros_with_data() {
        let source = MemorySource::new().with_records([
            MemoryRecord::at(at(3, 18, 9)),
            MemoryRecord::at(at(3, 18, 17)),
            MemoryRecord::at(at(3, 20, 1)),
        ]);
        let metric = TrendMetric::new("Signups").unit(TrendUnit::Day);
        let result = run(&source, &metric, Some("7")).unwrap();

        assert_eq!(result.trend.len(), 8);
        assert_eq!(result.trend.get("March 18, 2024"), Some(2.0));
        assert_eq!(result.trend.get("March 19, 2024"), Some(0.0));
        assert_eq!(result.value, Some(1.0));
    }

    #[test]
    fn weekly_and_monthly_bucket_counts() {
        let source = MemorySource::new();
        let weekly = TrendMetric::new("W").unit(TrendUnit::Week);
        assert_eq!(run(&source, &weekly, Some("P5W")).unwrap().trend.len(), 6);
        assert_eq!(run(&source, &weekly, Some("year")).unwrap().trend.len(), 53);

        let monthly = TrendMetric::new("M").unit(TrendUnit::Month);
        let result = run(&source, &monthly, Some("month")).unwrap();
        let labels: Vec<_> = result.trend.labels().collect();
        assert_eq!(labels, ["February 2024", "March 2024"]);
    }

    #[test]
    fn unaligned_windows_still_reach_the_current_bucket() {
        let source = MemorySource::new();

        // MTD starts on Friday March 1.
        let weekly = TrendMetric::new("W").unit(TrendUnit::Week);
        let result = run(&source, &weekly, Some("MTD")).unwrap();
        let labels: Vec<_> = result.trend.labels().collect();
        assert_eq!(
            labels,
            [
                "February 26 - March 3",
                "March 4 - March 10",
                "March 11 - March 17",
                "March 18 - March 24",
            ]
        );

        // Fifty days back is January 30.
        let monthly = TrendMetric::new("M").unit(TrendUnit::Month);
        let result = run(&source, &monthly, Some("P50D")).unwrap();
        let labels: Vec<_> = result.trend.labels().collect();
        assert_eq!(labels, ["January 2024", "February 2024", "March 2024"]);
    }

    #[test]
    fn headline_comes_from_the_current_bucket() {
        let source = MemorySource::new().with_records([
            MemoryRecord::at(at(3, 4, 9)),
            MemoryRecord::at(at(3, 19, 9)),
            MemoryRecord::at(at(3, 20, 9)),
        ]);
        let metric = TrendMetric::new("W").unit(TrendUnit::Week);
        let result = run(&source, &metric, Some("MTD")).unwrap();
        assert_eq!(result.trend.len(), 4);
        assert_eq!(result.value, Some(2.0));
    }

    #[test]
    fn unit_rolling_range_is_the_default_window() {
        let source = MemorySource::new();
        let metric = TrendMetric::new("Hourly").unit(TrendUnit::Hour).twelve_hour_time(false);
        let result = run(&source, &metric, None).unwrap();
        let labels: Vec<_> = result.trend.labels().collect();
        assert_eq!(labels, ["March 20 - 14:00", "March 20 - 15:00"]);
        assert_eq!(result.ranged.selected_range_key, None);
    }

    #[test]
    fn values_are_rounded_and_transformed() {
        let source = MemorySource::new().with_records([
            MemoryRecord::at(at(3, 20, 10)).value("cents", 1049.0),
            MemoryRecord::at(at(3, 20, 11)).value("cents", 1.0),
        ]);
        let metric = TrendMetric::new("Revenue")
            .unit(TrendUnit::Day)
            .function(AggregateFunction::Sum, Some("cents"))
            .with_rounding(Rounding::new(0, RoundingMode::HalfUp))
            .transform(|cents| cents / 100.0);
        let result = run(&source, &metric, Some("today")).unwrap();
        assert_eq!(result.value, Some(10.5));
    }

    #[test]
    fn buckets_use_metric_timezone() {
        // 03:00 UTC on the 20th is still the 19th in New York.
        let source = MemorySource::new().with_records([MemoryRecord::at(at(3, 20, 3))]);
        let metric = TrendMetric::new("Local")
            .unit(TrendUnit::Day)
            .timezone(chrono_tz::America::New_York);
        let result = run(&source, &metric, Some("3")).unwrap();
        assert_eq!(result.trend.get("March 19, 2024"), Some(1.0));
        assert_eq!(result.trend.get("March 20, 2024"), Some(0.0));
    }

    #[test]
    fn unbounded_trend_starts_at_earliest_bucket() {
        let source = MemorySource::new().with_records([
            MemoryRecord::at(at(1, 10, 0)),
            MemoryRecord::at(at(3, 2, 0)),
        ]);
        let metric = TrendMetric::new("All Time").unit(TrendUnit::Month);
        let result = run(&source, &metric, Some("ALL")).unwrap();
        let labels: Vec<_> = result.trend.labels().collect();
        assert_eq!(labels, ["January 2024", "February 2024", "March 2024"]);
        assert_eq!(result.trend.get("January 2024"), Some(1.0));
        assert!(result.ranged.range.is_none());
    }

    #[test]
    fn unbounded_trend_without_rows_is_empty() {
        let metric = TrendMetric::new("All Time").unit(TrendUnit::Month);
        let result = run(&MemorySource::new(), &metric, Some("ALL")).unwrap();
        assert!(result.trend.is_empty());
        assert_eq!(result.value, None);
    }

    #[test]
    fn explicit_range_overrides_tokens() {
        let start = chrono_tz::UTC.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap();
        let end = chrono_tz::UTC.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        let metric = TrendMetric::new("Pinned")
            .unit(TrendUnit::Day)
            .range(DateRange::new(start, end, None).unwrap());
        let result = run(&MemorySource::new(), &metric, Some("365")).unwrap();
        assert_eq!(result.trend.len(), 3);
        assert_eq!(result.ranged.selected_range_key, None);
    }

    #[test]
    fn unsupported_backend_fails_before_querying() {
        let source = MemorySource::new().with_backend("oracle");
        let metric = TrendMetric::new("Signups");
        let err = run(&source, &metric, Some("7")).unwrap_err();
        assert!(matches!(
            err,
            Error::Expression(ExpressionError::UnsupportedBackend { .. })
        ));
    }

    #[test]
    fn serializes_trend_in_label_order() {
        let source = MemorySource::new();
        let metric = TrendMetric::new("Signups").unit(TrendUnit::Day).prefix("#");
        let result = run(&source, &metric, Some("1")).unwrap();
        let json = serde_json::to_string(&MetricResult::Trend(result)).unwrap();
        assert!(json.contains(r#""trend":{"March 19, 2024":0.0,"March 20, 2024":0.0}"#));
        assert!(json.contains(r#""selected_range_key":"1""#));
        assert!(json.contains(r##""prefix":"#""##));
    }
}
