//! Orders fixture shared by the memory and SQLite sources.
//!
//! Both representations hold the same rows, so a metric computed against one
//! must equal the metric computed against the other.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use super::clock;
use crate::adapter::outbound::memory::{MemoryRecord, MemorySource};
use crate::adapter::outbound::sqlite::connection::{create_pool, DbPool};
use crate::adapter::outbound::sqlite::source::SqliteSource;
use crate::application::resolve::MetricContext;
use crate::error::{Error, Result};
use crate::port::outbound::source::DataSource;

/// `(created_at UTC, status, total)` for every order.
pub const ORDERS: &[(&str, &str, f64)] = &[
    ("2024-02-10 08:00:00", "paid", 50.0),
    ("2024-03-01 09:00:00", "paid", 10.0),
    ("2024-03-01 17:30:00", "paid", 15.5),
    ("2024-03-02 00:00:00", "refunded", 7.0),
    ("2024-03-15 12:00:00", "pending", 20.0),
    ("2024-03-19 23:00:00", "paid", 12.5),
    ("2024-03-20 11:00:00", "paid", 30.0),
];

/// Table definition matching [`ORDERS`].
pub const ORDERS_SCHEMA: &str = "CREATE TABLE orders (\
     id INTEGER PRIMARY KEY, \
     total REAL, \
     status TEXT, \
     created_at TEXT NOT NULL)";

fn timestamp(text: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .expect("valid fixture timestamp")
        .and_utc()
}

/// [`ORDERS`] as memory records with `total` and `status` columns.
pub fn order_records() -> Vec<MemoryRecord> {
    ORDERS
        .iter()
        .map(|(created_at, status, total)| {
            MemoryRecord::at(timestamp(created_at))
                .value("total", *total)
                .label("status", *status)
        })
        .collect()
}

/// A memory source holding [`ORDERS`].
pub fn memory_source() -> MemorySource {
    MemorySource::new().with_records(order_records())
}

/// Create the `orders` table in `pool` and insert [`ORDERS`].
///
/// # Errors
/// Returns an error if the pool or any statement fails.
pub fn seed_orders(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    diesel::sql_query(ORDERS_SCHEMA).execute(&mut conn)?;
    for (created_at, status, total) in ORDERS {
        diesel::sql_query("INSERT INTO orders (total, status, created_at) VALUES (?, ?, ?)")
            .bind::<diesel::sql_types::Double, _>(*total)
            .bind::<diesel::sql_types::Text, _>(*status)
            .bind::<diesel::sql_types::Text, _>(*created_at)
            .execute(&mut conn)?;
    }
    Ok(())
}

/// An in-memory SQLite source over a seeded `orders` table.
///
/// # Errors
/// Returns an error if the database cannot be opened or seeded.
pub fn sqlite_source() -> Result<SqliteSource> {
    let pool = create_pool(":memory:", 1)?;
    seed_orders(&pool)?;
    Ok(SqliteSource::new(pool, "orders"))
}

/// A context over `source` resolving ranges against [`clock::now`].
pub fn context(source: Arc<dyn DataSource>) -> MetricContext {
    MetricContext::new(source, Arc::new(clock::resolver()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sources_hold_every_order() {
        assert_eq!(memory_source().len(), ORDERS.len());

        let sqlite = sqlite_source().unwrap();
        let count = sqlite
            .aggregate(&crate::port::outbound::source::ScalarQuery {
                function: crate::domain::AggregateFunction::Count,
                column: "id".into(),
                between: None,
            })
            .unwrap();
        assert_eq!(count, Some(ORDERS.len() as f64));
    }
}
