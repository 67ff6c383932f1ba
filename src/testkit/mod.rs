//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`] - A pinned "now" and resolvers built on it.
//! - [`fixtures`] - One orders data set loadable into the memory source or
//!   into SQLite, plus a ready [`MetricContext`](crate::application::MetricContext).

pub mod clock;
pub mod fixtures;
