//! Handlers for the `value`, `trend` and `partition` commands.

use serde_json::json;

use super::command::{PartitionArgs, SourceArgs, TrendArgs, ValueArgs};
use super::context::CommandContext;
use super::output;
use crate::application::metric::{Metric, MetricRequest, PartitionMetric, TrendMetric, ValueMetric};
use crate::domain::{MetricResult, PartitionResult, TrendResult, ValueResult};
use crate::error::Result;

/// Apply the options every metric command shares.
macro_rules! configure {
    ($metric:expr, $ctx:expr, $source:expr) => {{
        let metric = $metric
            .function($source.function, $source.column.as_deref())
            .with_rounding($ctx.rounding($source))
            .timezone($ctx.timezone());
        match $ctx.config.cache_ttl() {
            Some(ttl) => metric.cache_for(ttl),
            None => metric,
        }
    }};
}

fn metric_name(source: &SourceArgs) -> String {
    source.name.clone().unwrap_or_else(|| {
        let column = source.column.as_deref().unwrap_or("rows");
        format!("{} {} {}", source.table, source.function, column)
    })
}

fn request(source: &SourceArgs, range: Option<&str>) -> MetricRequest {
    let request = MetricRequest::new(format!("/{}", source.table));
    match range {
        Some(range) => request.with_param("range", range),
        None => request,
    }
}

fn compute(
    ctx: &CommandContext,
    source: &SourceArgs,
    metric: &dyn Metric,
    range: Option<&str>,
) -> Result<MetricResult> {
    let metrics = ctx.metric_context(source)?;
    metrics.resolve(metric, &request(source, range))
}

/// Compute and print a value metric.
///
/// # Errors
/// Propagates range, connection and query errors.
pub fn execute_value(ctx: &CommandContext, args: &ValueArgs) -> Result<()> {
    let mut metric = configure!(ValueMetric::new(metric_name(&args.source)), ctx, &args.source);
    if let Some(column) = &args.date_column {
        metric = metric.date_column(column.clone());
    }

    if let MetricResult::Value(result) =
        compute(ctx, &args.source, &metric, args.range.as_deref())?
    {
        print_value(&result);
    }
    Ok(())
}

/// Compute and print a trend metric.
///
/// # Errors
/// Propagates range, expression, connection and query errors.
pub fn execute_trend(ctx: &CommandContext, args: &TrendArgs) -> Result<()> {
    let mut metric = configure!(TrendMetric::new(metric_name(&args.source)), ctx, &args.source)
        .unit(args.unit)
        .twelve_hour_time(ctx.config.metrics.twelve_hour_time && !args.twenty_four_hour);
    if let Some(column) = &args.date_column {
        metric = metric.date_column(column.clone());
    }

    if let MetricResult::Trend(result) =
        compute(ctx, &args.source, &metric, args.range.as_deref())?
    {
        print_trend(&result);
    }
    Ok(())
}

/// Compute and print a partition metric.
///
/// # Errors
/// Propagates connection and query errors.
pub fn execute_partition(ctx: &CommandContext, args: &PartitionArgs) -> Result<()> {
    let metric = configure!(
        PartitionMetric::new(metric_name(&args.source), args.group_by.clone()),
        ctx,
        &args.source
    );

    if let MetricResult::Partition(result) = compute(ctx, &args.source, &metric, None)? {
        print_partition(&result);
    }
    Ok(())
}

fn print_value(result: &ValueResult) {
    output::document(&json!({ "command": "value", "result": result }));

    output::section(&result.descriptor.name);
    if let Some(range) = &result.ranged.range {
        output::field("Range", range);
    }
    if let Some(previous) = result.previous {
        output::field(
            "Previous",
            output::decorate(previous, result.prefix.as_deref(), result.suffix.as_deref()),
        );
    }
    if let Some(change) = result.percent_changed {
        output::field("Change", format!("{change:+}%"));
    }
    output::headline(output::decorate(
        result.value,
        result.prefix.as_deref(),
        result.suffix.as_deref(),
    ));
}

fn print_trend(result: &TrendResult) {
    output::document(&json!({ "command": "trend", "result": result }));

    output::section(&result.descriptor.name);
    if let Some(range) = &result.ranged.range {
        output::field("Range", range);
    }
    for (label, value) in result.trend.iter() {
        output::field(label, value);
    }
    match result.value {
        Some(value) => output::headline(output::decorate(
            value,
            result.prefix.as_deref(),
            result.suffix.as_deref(),
        )),
        None => output::warning("No data in range"),
    }
}

fn print_partition(result: &PartitionResult) {
    output::document(&json!({ "command": "partition", "result": result }));

    output::section(&result.descriptor.name);
    if result.value.is_empty() {
        output::warning("No groups found");
    }
    for (group, value) in result.value.iter() {
        output::field(group, value);
    }
}
