//! Query engine port.
//!
//! A [`DataSource`] runs an aggregate over one table-like collection, either
//! as a single scalar or grouped by a column or bucket expression.

use chrono::{DateTime, Utc};

use crate::domain::{AggregateFunction, TrendUnit};
use crate::error::Result;

/// Inclusive UTC bounds on a date column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Between {
    pub column: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A single aggregate, optionally constrained to a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarQuery {
    pub function: AggregateFunction,
    pub column: String,
    pub between: Option<Between>,
}

/// A dialect-specific truncation expression and what it encodes.
///
/// `sql` is embedded verbatim by SQL engines. Engines that cannot run SQL
/// evaluate `column`, `unit` and `offset_seconds` instead, producing the same
/// key strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketExpression {
    pub sql: String,
    pub column: String,
    pub unit: TrendUnit,
    pub offset_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// Group by the raw value of a column.
    Column(String),
    /// Group by a truncated timestamp.
    Bucket(BucketExpression),
}

/// A grouped aggregate. Rows come back ordered ascending by key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedQuery {
    pub function: AggregateFunction,
    pub column: String,
    pub group: GroupKey,
    pub between: Option<Between>,
}

/// One group returned by the engine. `aggregate` is `None` for SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub key: String,
    pub aggregate: Option<f64>,
}

impl GroupedRow {
    pub fn new(key: impl Into<String>, aggregate: Option<f64>) -> Self {
        Self {
            key: key.into(),
            aggregate,
        }
    }
}

/// Port for the engine that executes aggregates.
pub trait DataSource: Send + Sync {
    /// Backend identifier used to pick a date expression dialect
    /// (`sqlite`, `mysql`, `pgsql`, ...).
    fn backend(&self) -> &str;

    /// Column counted when no value column is given.
    fn key_column(&self) -> &str {
        "id"
    }

    /// Column used for date windows when no date column is given.
    fn created_at_column(&self) -> &str {
        "created_at"
    }

    /// Run a single aggregate. `None` when the engine returns `NULL`.
    fn aggregate(&self, query: &ScalarQuery) -> Result<Option<f64>>;

    /// Run a grouped aggregate ordered ascending by key.
    fn grouped(&self, query: &GroupedQuery) -> Result<Vec<GroupedRow>>;
}
