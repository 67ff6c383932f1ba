//! Date truncation expressions per SQL backend.
//!
//! Every dialect renders an expression whose value is the bucket key for the
//! row (see [`crate::domain::bucket`]), after shifting the column by the
//! display timezone's UTC offset. Backends are looked up by name in a
//! [`DialectRegistry`] that callers can extend.

mod mysql;
mod postgres;
mod sqlite;
mod sqlsrv;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::domain::TrendUnit;
use crate::error::{ExpressionError, Result};
use crate::port::outbound::source::BucketExpression;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlsrv::SqlServerDialect;

/// Renders a bucket key expression for one SQL dialect.
pub trait TrendDateDialect: Send + Sync {
    /// Expression truncating `column`, shifted by `offset_seconds`, to
    /// `unit`. `column` is embedded verbatim.
    fn expression(&self, column: &str, unit: TrendUnit, offset_seconds: i32) -> String;
}

/// How a timezone offset is applied before truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shift {
    None,
    Hours(i32),
    Minutes(i32),
}

impl Shift {
    /// Whole hours when possible, otherwise whole minutes.
    pub(crate) fn from_seconds(offset_seconds: i32) -> Self {
        match offset_seconds {
            0 => Self::None,
            s if s % 3600 == 0 => Self::Hours(s / 3600),
            s => Self::Minutes(s / 60),
        }
    }
}

/// Backend name to dialect map.
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn TrendDateDialect>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectRegistry {
    /// A registry with the built-in dialects: `sqlite`, `mysql`, `mariadb`,
    /// `pgsql`, `postgres` and `sqlsrv`.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        let mysql: Arc<dyn TrendDateDialect> = Arc::new(MySqlDialect);
        let postgres: Arc<dyn TrendDateDialect> = Arc::new(PostgresDialect);
        registry.register_shared("sqlite", Arc::new(SqliteDialect));
        registry.register_shared("mysql", mysql.clone());
        registry.register_shared("mariadb", mysql);
        registry.register_shared("pgsql", postgres.clone());
        registry.register_shared("postgres", postgres);
        registry.register_shared("sqlsrv", Arc::new(SqlServerDialect));
        registry
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Add or replace the dialect for `backend`.
    pub fn register(&mut self, backend: impl Into<String>, dialect: impl TrendDateDialect + 'static) {
        self.register_shared(backend, Arc::new(dialect));
    }

    pub fn register_shared(&mut self, backend: impl Into<String>, dialect: Arc<dyn TrendDateDialect>) {
        self.dialects
            .insert(backend.into().to_ascii_lowercase(), dialect);
    }

    /// Registered backend names, sorted.
    #[must_use]
    pub fn backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }

    /// The dialect for `backend` (case-insensitive).
    ///
    /// # Errors
    /// Returns [`ExpressionError::UnsupportedBackend`] for unknown backends.
    pub fn dialect(&self, backend: &str) -> Result<&Arc<dyn TrendDateDialect>> {
        self.dialects
            .get(&backend.to_ascii_lowercase())
            .ok_or_else(|| {
                ExpressionError::UnsupportedBackend {
                    backend: backend.to_string(),
                }
                .into()
            })
    }

    /// Render the bucket expression for `backend`.
    ///
    /// # Errors
    /// Returns [`ExpressionError::UnsupportedBackend`] for unknown backends.
    pub fn make(
        &self,
        backend: &str,
        column: &str,
        unit: TrendUnit,
        offset_seconds: i32,
    ) -> Result<String> {
        let sql = self
            .dialect(backend)?
            .expression(column, unit, offset_seconds);
        trace!(backend, column, %unit, offset_seconds, sql = %sql, "Built bucket expression");
        Ok(sql)
    }

    /// Render the bucket expression along with what it encodes.
    ///
    /// # Errors
    /// Returns [`ExpressionError::UnsupportedBackend`] for unknown backends.
    pub fn bucket(
        &self,
        backend: &str,
        column: &str,
        unit: TrendUnit,
        offset_seconds: i32,
    ) -> Result<BucketExpression> {
        Ok(BucketExpression {
            sql: self.make(backend, column, unit, offset_seconds)?,
            column: column.to_string(),
            unit,
            offset_seconds,
        })
    }
}
