//! Command-line interface definitions.
//!
//! Defines the CLI structure for dashmetrics using `clap`. Subcommands
//! resolve range tokens, render bucket expressions and compute value, trend
//! and partition metrics over a SQLite table.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::domain::{AggregateFunction, RoundingMode, TrendUnit};

/// Dashboard metrics over SQL stores
#[derive(Parser, Debug)]
#[command(name = "dashmetrics")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "dashmetrics.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the dashmetrics CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a range token into a date window
    Range(RangeArgs),

    /// List the registered range names
    Ranges,

    /// Render the bucket expression for a backend
    Expression(ExpressionArgs),

    /// Aggregate a single value compared with the previous window
    Value(ValueArgs),

    /// Aggregate a gap-free series of time buckets
    Trend(TrendArgs),

    /// Aggregate one value per distinct column value
    Partition(PartitionArgs),
}

/// Clock and timezone overrides shared by range-aware commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TimeArgs {
    /// IANA timezone; overrides `metrics.timezone`
    #[arg(long)]
    pub timezone: Option<String>,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

/// Arguments for the `range` subcommand.
#[derive(Args, Debug)]
pub struct RangeArgs {
    /// Range token such as `MTD`, `30` or `P2W`
    pub token: String,

    #[command(flatten)]
    pub time: TimeArgs,
}

/// Arguments for the `expression` subcommand.
#[derive(Args, Debug)]
pub struct ExpressionArgs {
    /// Backend name such as `sqlite`, `mysql`, `pgsql` or `sqlsrv`
    #[arg(long, default_value = "sqlite")]
    pub backend: String,

    /// Date column to bucket
    #[arg(long, default_value = "created_at")]
    pub column: String,

    /// Bucket unit [month, week, day, hour, minute]
    #[arg(long, default_value = "day")]
    pub unit: TrendUnit,

    #[command(flatten)]
    pub time: TimeArgs,
}

/// Source table and aggregate shared by metric commands.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Table to aggregate
    #[arg(long)]
    pub table: String,

    /// SQLite database path; overrides `database.url`
    #[arg(long)]
    pub db: Option<String>,

    /// Aggregate function [count, sum, avg, min, max]
    #[arg(long, default_value = "count")]
    pub function: AggregateFunction,

    /// Column to aggregate; defaults to the key column
    #[arg(long)]
    pub column: Option<String>,

    /// Decimal places kept; overrides `metrics.precision`
    #[arg(long)]
    pub precision: Option<u32>,

    /// Midpoint rounding; overrides `metrics.rounding`
    #[arg(long)]
    pub rounding: Option<RoundingMode>,

    /// Display name of the metric
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for the `value` subcommand.
#[derive(Args, Debug)]
pub struct ValueArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Range token; without one the whole table is aggregated
    #[arg(long)]
    pub range: Option<String>,

    /// Date column constrained by the range
    #[arg(long)]
    pub date_column: Option<String>,

    #[command(flatten)]
    pub time: TimeArgs,
}

/// Arguments for the `trend` subcommand.
#[derive(Args, Debug)]
pub struct TrendArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bucket unit [month, week, day, hour, minute]
    #[arg(long, default_value = "day")]
    pub unit: TrendUnit,

    /// Range token; defaults to one unit back
    #[arg(long)]
    pub range: Option<String>,

    /// Date column to bucket
    #[arg(long)]
    pub date_column: Option<String>,

    /// Render hour and minute labels on a 24-hour clock
    #[arg(long)]
    pub twenty_four_hour: bool,

    #[command(flatten)]
    pub time: TimeArgs,
}

/// Arguments for the `partition` subcommand.
#[derive(Args, Debug)]
pub struct PartitionArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Column whose distinct values form the groups
    #[arg(long)]
    pub group_by: String,
}
