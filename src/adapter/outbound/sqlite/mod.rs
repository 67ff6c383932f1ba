//! SQLite query adapter.
//!
//! Runs metric aggregates against an existing SQLite table through Diesel's
//! raw query interface. The adapter never creates or migrates tables.

pub mod connection;
pub mod source;

pub use connection::{configure_sqlite_connection, create_pool, DbPool};
pub use source::SqliteSource;
