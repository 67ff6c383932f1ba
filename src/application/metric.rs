//! Metric definitions.
//!
//! A metric is a plain configuration struct built with chained setters. The
//! shared pieces (identity, rounding, range selection) live in embedded
//! structs exposed through small capability traits so the aggregators can be
//! written once against them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use super::range::RangeResolver;
use super::resolve::MetricContext;
use crate::domain::{
    AggregateFunction, DateRange, MetricDescriptor, MetricResult, RangeOption, Rounding,
    TrendUnit,
};
use crate::error::Result;

/// Post-processing applied to every reported number.
pub type Transform = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Identity and caching settings shared by every metric.
#[derive(Debug, Clone)]
pub struct MetricMeta {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub timezone: Tz,
    pub cache_for: Option<Duration>,
    /// Extra parts appended to the cache key.
    pub cache_keys: Vec<String>,
}

impl MetricMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            timezone: Tz::UTC,
            cache_for: None,
            cache_keys: Vec::new(),
        }
    }
}

/// Lowercase, dash-separated form of `name`.
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Identity of a metric.
pub trait Describe {
    fn meta(&self) -> &MetricMeta;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn uri_key(&self) -> String {
        slug(&self.meta().name)
    }

    fn descriptor(&self) -> MetricDescriptor {
        let meta = self.meta();
        MetricDescriptor {
            name: meta.name.clone(),
            uri_key: self.uri_key(),
            title: meta.title.clone(),
            description: meta.description.clone(),
        }
    }
}

pub trait HasRounding {
    fn rounding(&self) -> Rounding;

    /// Round a raw aggregate, treating null as zero.
    fn round(&self, aggregate: Option<f64>) -> f64 {
        self.rounding().apply(aggregate.unwrap_or(0.0))
    }
}

pub trait HasRangeSelection {
    fn range_selection(&self) -> &RangeSelection;

    /// See [`RangeSelection::window`].
    ///
    /// # Errors
    /// Propagates range resolution errors.
    fn select_window(
        &self,
        resolver: &RangeResolver,
        tz: Tz,
        requested: Option<&str>,
        fallback: Option<&str>,
    ) -> Result<Window> {
        self.range_selection()
            .window(resolver, tz, requested, fallback)
    }

    fn range_options(&self) -> Vec<RangeOption> {
        self.range_selection().options.clone()
    }
}

/// Which window a ranged metric covers.
#[derive(Debug, Clone, Default)]
pub struct RangeSelection {
    /// Token used when the request does not pick one.
    pub selected: Option<String>,
    /// Tokens offered to the dashboard. When present, requested tokens are
    /// coerced into this set.
    pub options: Vec<RangeOption>,
    /// A concrete window that overrides any token.
    pub explicit: Option<DateRange>,
}

/// A resolved window and the token it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub key: Option<String>,
    pub range: Option<DateRange>,
}

/// Orders range tokens numerically when both are integers, lexically
/// otherwise.
fn compare_tokens(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

impl RangeSelection {
    /// The token to resolve: the requested one, else the default, coerced
    /// into the option set.
    ///
    /// A token outside the options is replaced by the largest option when
    /// nothing was chosen, and otherwise capped at the largest option.
    #[must_use]
    pub fn effective_key(&self, requested: Option<&str>) -> Option<String> {
        let key = requested
            .map(str::to_string)
            .or_else(|| self.selected.clone());

        let largest = self
            .options
            .iter()
            .map(|option| option.value.as_str())
            .max_by(|a, b| compare_tokens(a, b));
        let Some(largest) = largest else {
            return key;
        };

        match key {
            Some(key) if self.options.iter().any(|option| option.value == key) => Some(key),
            Some(key) => Some(
                std::cmp::min_by(key.as_str(), largest, |a, b| compare_tokens(a, b)).to_string(),
            ),
            None => Some(largest.to_string()),
        }
    }

    /// Resolve the window for a request. `fallback` is resolved when no token
    /// is selected at all. An explicit range wins over any token and reports
    /// no key.
    ///
    /// # Errors
    /// Propagates range resolution errors.
    pub fn window(
        &self,
        resolver: &RangeResolver,
        tz: Tz,
        requested: Option<&str>,
        fallback: Option<&str>,
    ) -> Result<Window> {
        if let Some(range) = &self.explicit {
            return Ok(Window {
                key: None,
                range: Some(range.clone()),
            });
        }
        let key = self.effective_key(requested);
        let range = match key.as_deref().or(fallback) {
            Some(token) => resolver.resolve(token, tz)?,
            None => None,
        };
        Ok(Window { key, range })
    }
}

/// Request parameters a metric is computed for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricRequest {
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl MetricRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The `range` parameter, if any.
    pub fn range(&self) -> Option<&str> {
        self.params.get("range").map(String::as_str)
    }

    /// Parameters as a sorted query string.
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Anything that can be computed into a [`MetricResult`].
pub trait Metric: Describe + Send + Sync {
    /// Compute the result, bypassing any cache.
    ///
    /// # Errors
    /// Propagates range, expression and data source errors.
    fn calculate(&self, ctx: &MetricContext, request: &MetricRequest) -> Result<MetricResult>;

    /// Key under which results for `request` are cached.
    fn cache_key(&self, request: &MetricRequest) -> String {
        let mut key = format!(
            "dashmetrics.metric.{}.{}?{}",
            self.uri_key(),
            request.path,
            request.query_string()
        );
        for extra in &self.meta().cache_keys {
            key.push('.');
            key.push_str(extra);
        }
        key
    }

    fn cache_ttl(&self) -> Option<Duration> {
        self.meta().cache_for
    }
}

macro_rules! shared_setters {
    () => {
        #[must_use]
        pub fn title(mut self, title: impl Into<String>) -> Self {
            self.meta.title = Some(title.into());
            self
        }

        #[must_use]
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.meta.description = Some(description.into());
            self
        }

        #[must_use]
        pub fn timezone(mut self, timezone: Tz) -> Self {
            self.meta.timezone = timezone;
            self
        }

        #[must_use]
        pub fn cache_for(mut self, ttl: Duration) -> Self {
            self.meta.cache_for = Some(ttl);
            self
        }

        #[must_use]
        pub fn cache_key_part(mut self, part: impl Into<String>) -> Self {
            self.meta.cache_keys.push(part.into());
            self
        }

        #[must_use]
        pub fn with_rounding(mut self, rounding: Rounding) -> Self {
            self.rounding = rounding;
            self
        }

        #[must_use]
        pub fn function(mut self, function: AggregateFunction, column: Option<&str>) -> Self {
            self.function = function;
            self.column = column.map(str::to_string);
            self
        }

        #[must_use]
        pub fn transform(mut self, transform: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
            self.transform = Some(Arc::new(transform));
            self
        }

        /// Apply the configured transform, if any.
        pub fn transformed(&self, value: f64) -> f64 {
            self.transform.as_ref().map_or(value, |transform| transform(value))
        }
    };
}

macro_rules! ranged_setters {
    () => {
        #[must_use]
        pub fn selected_range(mut self, token: impl Into<String>) -> Self {
            self.selection.selected = Some(token.into());
            self
        }

        #[must_use]
        pub fn ranges(mut self, options: impl IntoIterator<Item = RangeOption>) -> Self {
            self.selection.options = options.into_iter().collect();
            self
        }

        #[must_use]
        pub fn range(mut self, range: DateRange) -> Self {
            self.selection.explicit = Some(range);
            self
        }

        #[must_use]
        pub fn date_column(mut self, column: impl Into<String>) -> Self {
            self.date_column = Some(column.into());
            self
        }

        #[must_use]
        pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
            self.prefix = Some(prefix.into());
            self
        }

        #[must_use]
        pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
            self.suffix = Some(suffix.into());
            self
        }
    };
}

/// A single number compared with the preceding window.
#[derive(Clone)]
pub struct ValueMetric {
    pub meta: MetricMeta,
    pub rounding: Rounding,
    pub selection: RangeSelection,
    pub function: AggregateFunction,
    /// Value column; the source's key column when `None`.
    pub column: Option<String>,
    /// Date column; the source's `created_at` column when `None`.
    pub date_column: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub zero_result: bool,
    pub transform: Option<Transform>,
}

impl ValueMetric {
    /// A count over the source's key column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            rounding: Rounding::default(),
            selection: RangeSelection::default(),
            function: AggregateFunction::Count,
            column: None,
            date_column: None,
            prefix: None,
            suffix: None,
            zero_result: false,
            transform: None,
        }
    }

    shared_setters!();
    ranged_setters!();

    #[must_use]
    pub fn zero_result(mut self, zero_result: bool) -> Self {
        self.zero_result = zero_result;
        self
    }
}

/// Zero-filled buckets over a window.
#[derive(Clone)]
pub struct TrendMetric {
    pub meta: MetricMeta,
    pub rounding: Rounding,
    pub selection: RangeSelection,
    pub function: AggregateFunction,
    pub column: Option<String>,
    pub date_column: Option<String>,
    pub unit: TrendUnit,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub twelve_hour_time: bool,
    pub transform: Option<Transform>,
}

impl TrendMetric {
    /// A daily count over the source's key column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            rounding: Rounding::default(),
            selection: RangeSelection::default(),
            function: AggregateFunction::Count,
            column: None,
            date_column: None,
            unit: TrendUnit::Day,
            prefix: None,
            suffix: None,
            twelve_hour_time: true,
            transform: None,
        }
    }

    shared_setters!();
    ranged_setters!();

    #[must_use]
    pub fn unit(mut self, unit: TrendUnit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn twelve_hour_time(mut self, twelve_hour_time: bool) -> Self {
        self.twelve_hour_time = twelve_hour_time;
        self
    }
}

/// Aggregates grouped by a column.
#[derive(Clone)]
pub struct PartitionMetric {
    pub meta: MetricMeta,
    pub rounding: Rounding,
    pub function: AggregateFunction,
    pub column: Option<String>,
    pub group_by: String,
    pub transform: Option<Transform>,
}

impl PartitionMetric {
    /// A count per distinct value of `group_by`.
    pub fn new(name: impl Into<String>, group_by: impl Into<String>) -> Self {
        Self {
            meta: MetricMeta::new(name),
            rounding: Rounding::default(),
            function: AggregateFunction::Count,
            column: None,
            group_by: group_by.into(),
            transform: None,
        }
    }

    shared_setters!();
}

macro_rules! capabilities {
    ($ty:ty) => {
        impl Describe for $ty {
            fn meta(&self) -> &MetricMeta {
                &self.meta
            }
        }

        impl HasRounding for $ty {
            fn rounding(&self) -> Rounding {
                self.rounding
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("name", &self.meta.name)
                    .field("function", &self.function)
                    .field("column", &self.column)
                    .finish_non_exhaustive()
            }
        }
    };
}

capabilities!(ValueMetric);
capabilities!(TrendMetric);
capabilities!(PartitionMetric);

impl HasRangeSelection for ValueMetric {
    fn range_selection(&self) -> &RangeSelection {
        &self.selection
    }
}

impl HasRangeSelection for TrendMetric {
    fn range_selection(&self) -> &RangeSelection {
        &self.selection
    }
}
