//! Metric resolution with optional caching.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::dialect::DialectRegistry;
use super::metric::{Metric, MetricRequest};
use super::range::RangeResolver;
use crate::domain::MetricResult;
use crate::error::Result;
use crate::port::outbound::cache::MetricCache;
use crate::port::outbound::source::DataSource;

/// Everything a metric needs to compute itself.
#[derive(Clone)]
pub struct MetricContext {
    pub source: Arc<dyn DataSource>,
    pub resolver: Arc<RangeResolver>,
    pub dialects: Arc<DialectRegistry>,
    pub cache: Option<Arc<dyn MetricCache>>,
}

impl MetricContext {
    /// A context with the built-in dialects and no cache.
    pub fn new(source: Arc<dyn DataSource>, resolver: Arc<RangeResolver>) -> Self {
        Self {
            source,
            resolver,
            dialects: Arc::new(DialectRegistry::new()),
            cache: None,
        }
    }

    #[must_use]
    pub fn with_dialects(mut self, dialects: Arc<DialectRegistry>) -> Self {
        self.dialects = dialects;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn MetricCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Compute `metric` for `request`, going through the cache when both a
    /// cache and a TTL on the metric are configured.
    ///
    /// # Errors
    /// Propagates errors from the metric's calculation.
    #[instrument(skip_all, fields(metric = %metric.uri_key(), path = %request.path))]
    pub fn resolve(&self, metric: &dyn Metric, request: &MetricRequest) -> Result<MetricResult> {
        match (&self.cache, metric.cache_ttl()) {
            (Some(cache), Some(ttl)) => {
                let key = metric.cache_key(request);
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Resolving metric through cache");
                cache.remember(&key, ttl, &mut || metric.calculate(self, request))
            }
            _ => metric.calculate(self, request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::clock::FixedClock;
    use crate::adapter::outbound::memory::{MemoryCache, MemoryRecord, MemorySource};
    use crate::application::metric::PartitionMetric;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn context(source: Arc<MemorySource>) -> MetricContext {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()));
        MetricContext::new(source, Arc::new(RangeResolver::new(clock)))
            .with_cache(Arc::new(MemoryCache::new()))
    }

    fn record(status: &str) -> MemoryRecord {
        MemoryRecord::at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()).label("status", status)
    }

    fn paid_count(result: &MetricResult) -> Option<f64> {
        match result {
            MetricResult::Partition(partition) => partition.value.get("paid"),
            _ => None,
        }
    }

    #[test]
    fn cached_metric_is_not_recomputed_within_ttl() {
        let source = Arc::new(MemorySource::new().with_records([record("paid")]));
        let ctx = context(source.clone());
        let metric = PartitionMetric::new("Orders By Status", "status")
            .cache_for(Duration::from_secs(300));
        let request = MetricRequest::new("/orders");

        let first = ctx.resolve(&metric, &request).unwrap();
        source.insert(record("paid"));
        let second = ctx.resolve(&metric, &request).unwrap();

        assert_eq!(paid_count(&first), Some(1.0));
        assert_eq!(paid_count(&second), Some(1.0));
    }

    #[test]
    fn uncached_metric_is_always_recomputed() {
        let source = Arc::new(MemorySource::new().with_records([record("paid")]));
        let ctx = context(source.clone());
        let metric = PartitionMetric::new("Orders By Status", "status");
        let request = MetricRequest::new("/orders");

        ctx.resolve(&metric, &request).unwrap();
        source.insert(record("paid"));
        let second = ctx.resolve(&metric, &request).unwrap();

        assert_eq!(paid_count(&second), Some(2.0));
    }

    #[test]
    fn cache_key_includes_sorted_params_and_extras() {
        let metric = PartitionMetric::new("Orders By Status", "status")
            .cache_key_part("tenant-7");
        let request = MetricRequest::new("/orders")
            .with_param("range", "MTD")
            .with_param("a", "1");
        assert_eq!(
            metric.cache_key(&request),
            "dashmetrics.metric.orders-by-status./orders?a=1&range=MTD.tenant-7"
        );
    }
}
