//! Trend aggregation over the memory and SQLite sources.

use std::sync::Arc;

use chrono_tz::America::New_York;

use dashmetrics::adapter::outbound::memory::MemorySource;
use dashmetrics::application::dialect::DialectRegistry;
use dashmetrics::application::metric::{MetricRequest, TrendMetric};
use dashmetrics::application::trend::TrendAggregator;
use dashmetrics::domain::{
    AggregateFunction, MetricResult, Rounding, RoundingMode, TrendResult, TrendUnit,
};
use dashmetrics::testkit::clock::resolver;
use dashmetrics::testkit::fixtures::{context, memory_source, sqlite_source};

fn revenue() -> TrendMetric {
    TrendMetric::new("Revenue")
        .function(AggregateFunction::Sum, Some("total"))
        .with_rounding(Rounding::new(2, RoundingMode::HalfUp))
}

fn trend(source: &MemorySource, metric: &TrendMetric, range: &str) -> TrendResult {
    let resolver = resolver();
    let dialects = DialectRegistry::new();
    TrendAggregator::new(source, &resolver, &dialects)
        .aggregate(metric, Some(range))
        .unwrap()
}

#[test]
fn thirty_day_trend_on_empty_source_has_thirty_one_zero_buckets() {
    let result = trend(&MemorySource::new(), &revenue(), "30");
    assert_eq!(result.trend.len(), 31);
    assert!(result.trend.iter().all(|(_, value)| value == 0.0));
    assert_eq!(result.trend.labels().next(), Some("February 19, 2024"));
    assert_eq!(result.trend.last(), Some(("March 20, 2024", 0.0)));
    assert_eq!(result.value, Some(0.0));
}

#[test]
fn real_rows_replace_zero_buckets() {
    let result = trend(&memory_source(), &revenue(), "30");
    assert_eq!(result.trend.len(), 31);
    assert_eq!(result.trend.get("March 1, 2024"), Some(25.5));
    assert_eq!(result.trend.get("March 2, 2024"), Some(7.0));
    assert_eq!(result.trend.get("March 15, 2024"), Some(20.0));
    assert_eq!(result.trend.get("March 3, 2024"), Some(0.0));
    assert_eq!(result.value, Some(30.0));

    let total: f64 = result.trend.iter().map(|(_, value)| value).sum();
    assert_eq!(total, 95.0);
}

#[test]
fn fully_populated_trend_has_no_zero_fill() {
    use chrono::{TimeZone, Utc};
    use dashmetrics::adapter::outbound::memory::MemoryRecord;

    let source = MemorySource::new().with_records((13..=20).map(|day| {
        MemoryRecord::at(Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap())
            .value("total", f64::from(day))
    }));
    let result = trend(&source, &revenue(), "7");

    assert_eq!(result.trend.len(), 8);
    assert!(result.trend.iter().all(|(_, value)| value > 0.0));
    assert_eq!(result.trend.get("March 13, 2024"), Some(13.0));
    assert_eq!(result.value, Some(20.0));
}

#[test]
fn monthly_trend_spans_requested_months() {
    let metric = revenue().unit(TrendUnit::Month);
    let result = trend(&memory_source(), &metric, "YTD");
    let labels: Vec<_> = result.trend.labels().collect();
    assert_eq!(labels, ["January 2024", "February 2024", "March 2024"]);
    assert_eq!(result.trend.get("January 2024"), Some(0.0));
    assert_eq!(result.trend.get("February 2024"), Some(50.0));
    assert_eq!(result.trend.get("March 2024"), Some(95.0));
}

#[test]
fn hourly_labels_follow_the_metric_timezone() {
    let metric = revenue()
        .unit(TrendUnit::Hour)
        .timezone(New_York)
        .twelve_hour_time(false);
    let result = trend(&memory_source(), &metric, "P1D");
    // 11:00 UTC is 07:00 in New York after the March DST change.
    assert_eq!(result.trend.get("March 20 - 7:00"), Some(30.0));
    assert_eq!(result.trend.last(), Some(("March 20 - 8:00", 0.0)));
}

#[test]
fn unbounded_trend_starts_at_the_earliest_bucket() {
    let metric = revenue().unit(TrendUnit::Month);
    let result = trend(&memory_source(), &metric, "ALL");
    assert_eq!(result.trend.labels().next(), Some("February 2024"));
    assert_eq!(result.trend.len(), 2);

    let empty = trend(&MemorySource::new(), &metric, "ALL");
    assert!(empty.trend.is_empty());
    assert_eq!(empty.value, None);
}

#[test]
fn sqlite_and_memory_sources_agree() {
    let metric = revenue();
    let request = MetricRequest::new("/orders").with_param("range", "30");

    let memory = context(Arc::new(memory_source()))
        .resolve(&metric, &request)
        .unwrap();
    let sqlite = context(Arc::new(sqlite_source().unwrap()))
        .resolve(&metric, &request)
        .unwrap();

    let (MetricResult::Trend(memory), MetricResult::Trend(sqlite)) = (memory, sqlite) else {
        panic!("expected trend results");
    };
    assert_eq!(
        memory.trend.iter().collect::<Vec<_>>(),
        sqlite.trend.iter().collect::<Vec<_>>()
    );
}

#[test]
fn weekly_sqlite_trend_uses_iso_weeks() {
    let metric = revenue().unit(TrendUnit::Week);
    let request = MetricRequest::new("/orders").with_param("range", "P3W");
    let result = context(Arc::new(sqlite_source().unwrap()))
        .resolve(&metric, &request)
        .unwrap();
    let MetricResult::Trend(result) = result else {
        panic!("expected trend result");
    };

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
    assert_eq!(result.trend.get("February 26 - March 3"), Some(32.5));
    assert_eq!(result.trend.get("March 18 - March 24"), Some(42.5));
}
