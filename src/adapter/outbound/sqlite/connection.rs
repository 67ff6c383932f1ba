//! Database connection management using Diesel ORM.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;

use crate::error::{Error, Result};

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Create a connection pool for the given database URL.
///
/// Every `:memory:` connection opens its own empty database, so in-memory
/// pools should use `max_size` 1.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size.max(1))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Configure SQLite connection pragmas used for metric reads.
///
/// # Errors
/// Returns an error if a pragma fails to apply.
pub fn configure_sqlite_connection(conn: &mut SqliteConnection) -> Result<()> {
    diesel::sql_query("PRAGMA busy_timeout=5000")
        .execute(conn)
        .map_err(|e| Error::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pool_with_memory_db() {
        let pool = create_pool(":memory:", 1).unwrap();
        assert!(pool.get().is_ok());
    }

    #[test]
    fn zero_max_size_is_raised_to_one() {
        let pool = create_pool(":memory:", 0).unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn configure_sqlite_connection_sets_pragmas() {
        let pool = create_pool(":memory:", 1).unwrap();
        let mut conn = pool.get().unwrap();
        assert!(configure_sqlite_connection(&mut conn).is_ok());
    }
}
