//! dashmetrics - dashboard metrics over SQL stores.
//!
//! Resolves range tokens such as `MTD`, `P7D` or `30` into calendar windows
//! and aggregates records into values, partitions and gap-free trends.
//!
//! # Architecture
//!
//! - **`domain`** - Intervals, date ranges, bucket keys and labels, rounding,
//!   result types. No I/O.
//! - **`application`** - Range resolver, dialect expression factory, the
//!   value/trend/partition aggregators and metric definitions.
//! - **`port`** - Traits for the data source, metric cache and clock.
//! - **`adapter`** - SQLite (diesel) and in-memory implementations of the
//!   ports, plus the CLI.
//! - **`infrastructure`** - Configuration loading and logging setup.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dashmetrics::adapter::outbound::clock::SystemClock;
//! use dashmetrics::application::range::RangeResolver;
//!
//! let resolver = RangeResolver::new(Arc::new(SystemClock));
//! let range = resolver.resolve("MTD", chrono_tz::UTC).unwrap();
//! println!("{}", range.unwrap());
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
