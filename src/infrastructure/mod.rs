//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing metric
//! logic: configuration loading and logging setup.

pub mod config;
