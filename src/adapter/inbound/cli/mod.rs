//! CLI module graph.

pub mod command;
pub mod context;
pub mod expression;
pub mod metric;
pub mod output;
pub mod range;
