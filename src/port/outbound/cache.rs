//! Metric result cache port.

use std::time::Duration;

use crate::domain::MetricResult;
use crate::error::Result;

/// Port for caching computed metric results by key.
pub trait MetricCache: Send + Sync {
    /// Cached result for `key`, if present and not expired.
    fn get(&self, key: &str) -> Option<MetricResult>;

    /// Store `value` under `key` for `ttl`.
    fn put(&self, key: &str, ttl: Duration, value: MetricResult);

    /// Drop any cached result for `key`.
    fn forget(&self, key: &str);

    /// Return the cached result for `key`, or compute, store and return it.
    ///
    /// Errors from `compute` propagate and nothing is stored.
    fn remember(
        &self,
        key: &str,
        ttl: Duration,
        compute: &mut dyn FnMut() -> Result<MetricResult>,
    ) -> Result<MetricResult> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.put(key, ttl, value.clone());
        Ok(value)
    }
}
