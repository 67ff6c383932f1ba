//! Concurrent in-memory metric cache with per-entry TTL.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use crate::domain::MetricResult;
use crate::port::outbound::cache::MetricCache;

const DEFAULT_MAX_ENTRIES: usize = 1024;

struct Entry {
    expires_at: Instant,
    value: MetricResult,
}

/// Thread-safe result cache.
///
/// Expired entries are dropped on read and during garbage collection, which
/// runs whenever an insert pushes the cache past its size limit.
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    #[must_use]
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, then the soonest-expiring ones until the cache
    /// fits its limit.
    pub fn gc(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        if self.entries.len() > self.max_entries {
            let mut by_expiry: Vec<(String, Instant)> = self
                .entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().expires_at))
                .collect();
            by_expiry.sort_by(|a, b| a.1.cmp(&b.1));

            let excess = self.entries.len() - self.max_entries;
            for (key, _) in by_expiry.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }
    }
}

impl MetricCache for MemoryCache {
    fn get(&self, key: &str) -> Option<MetricResult> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                trace!(key, "Metric cache hit");
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    fn put(&self, key: &str, ttl: Duration, value: MetricResult) {
        self.entries.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + ttl,
                value,
            },
        );
        if self.entries.len() > self.max_entries {
            self.gc();
        }
    }

    fn forget(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetricDescriptor, PartitionResult, Series};
    use crate::error::Error;

    fn result(name: &str) -> MetricResult {
        MetricResult::Partition(PartitionResult {
            descriptor: MetricDescriptor {
                name: name.into(),
                uri_key: name.to_lowercase(),
                title: None,
                description: None,
            },
            value: Series::new(),
        })
    }

    #[test]
    fn remember_computes_once_while_fresh() {
        let cache = MemoryCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache
                .remember("k", Duration::from_secs(60), &mut || {
                    calls += 1;
                    Ok(result("Orders"))
                })
                .unwrap();
            assert_eq!(value.descriptor().name, "Orders");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn expired_entries_are_recomputed() {
        let cache = MemoryCache::new();
        cache.put("k", Duration::ZERO, result("Old"));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_compute_stores_nothing() {
        let cache = MemoryCache::new();
        let outcome = cache.remember("k", Duration::from_secs(60), &mut || {
            Err(Error::Database("boom".into()))
        });
        assert!(outcome.is_err());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn gc_enforces_capacity() {
        let cache = MemoryCache::with_capacity(2);
        cache.put("a", Duration::from_secs(10), result("A"));
        cache.put("b", Duration::from_secs(20), result("B"));
        cache.put("c", Duration::from_secs(30), result("C"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn forget_removes_entry() {
        let cache = MemoryCache::new();
        cache.put("k", Duration::from_secs(60), result("A"));
        cache.forget("k");
        assert!(cache.get("k").is_none());
    }
}
