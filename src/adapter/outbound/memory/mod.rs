//! In-process adapters for tests, demos and embedding.

pub mod cache;
pub mod source;

pub use cache::MemoryCache;
pub use source::{MemoryRecord, MemorySource};
