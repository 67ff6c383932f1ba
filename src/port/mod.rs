//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The aggregators never talk to a database, cache or wall clock directly.
//! They go through the outbound ports defined here, which adapters implement.
//!
//! # Available Ports
//!
//! - [`outbound::source::DataSource`] - Runs scalar and grouped aggregates
//! - [`outbound::cache::MetricCache`] - Remembers computed results for a TTL
//! - [`outbound::clock::Clock`] - Supplies "now"

pub mod outbound;
