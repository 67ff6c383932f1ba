//! SQLite-backed [`DataSource`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Double, Nullable, Text};
use tracing::debug;

use super::connection::{configure_sqlite_connection, DbPool};
use crate::error::{Error, Result};
use crate::port::outbound::source::{
    Between, DataSource, GroupKey, GroupedQuery, GroupedRow, ScalarQuery,
};

/// Timestamp layout used when binding window bounds. Matches SQLite's
/// canonical `datetime()` text so string comparison orders correctly.
const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Aggregates rows of one SQLite table.
///
/// The table, column names and bucket expressions are embedded verbatim;
/// callers are responsible for quoting. Date columns are expected to hold UTC
/// text in `YYYY-MM-DD HH:MM:SS` form.
pub struct SqliteSource {
    pool: DbPool,
    table: String,
    key_column: String,
    created_at_column: String,
}

#[derive(QueryableByName)]
struct ScalarRow {
    #[diesel(sql_type = Nullable<Double>)]
    aggregate: Option<f64>,
}

#[derive(QueryableByName)]
struct GroupRow {
    #[diesel(sql_type = Nullable<Text>)]
    group_key: Option<String>,
    #[diesel(sql_type = Nullable<Double>)]
    aggregate: Option<f64>,
}

impl SqliteSource {
    #[must_use]
    pub fn new(pool: DbPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            key_column: "id".into(),
            created_at_column: "created_at".into(),
        }
    }

    #[must_use]
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    #[must_use]
    pub fn with_created_at_column(mut self, column: impl Into<String>) -> Self {
        self.created_at_column = column.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn connection(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        configure_sqlite_connection(&mut conn)?;
        Ok(conn)
    }

    fn where_clause(between: Option<&Between>) -> String {
        between
            .map(|b| format!(" WHERE {} BETWEEN ? AND ?", b.column))
            .unwrap_or_default()
    }
}

fn bound(at: &DateTime<Utc>) -> String {
    at.format(BOUND_FORMAT).to_string()
}

impl DataSource for SqliteSource {
    fn backend(&self) -> &str {
        "sqlite"
    }

    fn key_column(&self) -> &str {
        &self.key_column
    }

    fn created_at_column(&self) -> &str {
        &self.created_at_column
    }

    fn aggregate(&self, query: &ScalarQuery) -> Result<Option<f64>> {
        let sql = format!(
            "SELECT CAST({}({}) AS REAL) AS aggregate FROM {}{}",
            query.function.sql_name(),
            query.column,
            self.table,
            Self::where_clause(query.between.as_ref()),
        );
        debug!(sql = %sql, "Running scalar aggregate");

        let mut conn = self.connection()?;
        let rows: Vec<ScalarRow> = match &query.between {
            Some(between) => diesel::sql_query(&sql)
                .bind::<Text, _>(bound(&between.start))
                .bind::<Text, _>(bound(&between.end))
                .load(&mut conn)?,
            None => diesel::sql_query(&sql).load(&mut conn)?,
        };

        Ok(rows.into_iter().next().and_then(|row| row.aggregate))
    }

    fn grouped(&self, query: &GroupedQuery) -> Result<Vec<GroupedRow>> {
        let group = match &query.group {
            GroupKey::Column(column) => column.as_str(),
            GroupKey::Bucket(expression) => expression.sql.as_str(),
        };
        let sql = format!(
            "SELECT CAST({group} AS TEXT) AS group_key, CAST({}({}) AS REAL) AS aggregate \
             FROM {}{} GROUP BY group_key ORDER BY group_key ASC",
            query.function.sql_name(),
            query.column,
            self.table,
            Self::where_clause(query.between.as_ref()),
        );
        debug!(sql = %sql, "Running grouped aggregate");

        let mut conn = self.connection()?;
        let rows: Vec<GroupRow> = match &query.between {
            Some(between) => diesel::sql_query(&sql)
                .bind::<Text, _>(bound(&between.start))
                .bind::<Text, _>(bound(&between.end))
                .load(&mut conn)?,
            None => diesel::sql_query(&sql).load(&mut conn)?,
        };

        Ok(rows
            .into_iter()
            .map(|row| GroupedRow::new(row.group_key.unwrap_or_default(), row.aggregate))
            .collect())
    }
}
