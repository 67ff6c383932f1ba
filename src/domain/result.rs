//! Serializable metric results.
//!
//! Every result flattens a [`MetricDescriptor`] into its top level, and
//! ranged results (value and trend) add a [`RangedDescriptor`].

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::range::DateRange;

/// Identity of the metric that produced a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub uri_key: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// One entry of the range selector offered to a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeOption {
    pub label: String,
    pub value: String,
}

impl RangeOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Range selection state attached to value and trend results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangedDescriptor {
    pub selected_range_key: Option<String>,
    pub range: Option<DateRange>,
    pub ranges: Vec<RangeOption>,
}

/// Insertion-ordered label to number map. Serializes as a JSON object whose
/// keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl Series {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `label` at the end, or overwrite its value in place when it is
    /// already present.
    pub fn set(&mut self, label: impl Into<String>, value: f64) {
        let label = label.into();
        match self.index.get(&label) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, value));
            }
        }
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.index.get(label).map(|&position| self.entries[position].1)
    }

    #[must_use]
    pub fn last(&self) -> Option<(&str, f64)> {
        self.entries
            .last()
            .map(|(label, value)| (label.as_str(), *value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(label, value)| (label.as_str(), *value))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Apply `f` to every value.
    pub fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        for (_, value) in &mut self.entries {
            *value = f(*value);
        }
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// A single number compared against the preceding window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueResult {
    #[serde(flatten)]
    pub descriptor: MetricDescriptor,
    pub value: f64,
    pub previous: Option<f64>,
    pub percent_changed: Option<f64>,
    pub positive_change: bool,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub zero_result: bool,
    #[serde(flatten)]
    pub ranged: RangedDescriptor,
}

/// Zero-filled buckets plus the last bucket's value as headline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    #[serde(flatten)]
    pub descriptor: MetricDescriptor,
    pub value: Option<f64>,
    pub trend: Series,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    #[serde(flatten)]
    pub ranged: RangedDescriptor,
}

/// Aggregates grouped by a plain column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionResult {
    #[serde(flatten)]
    pub descriptor: MetricDescriptor,
    pub value: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricResult {
    Value(ValueResult),
    Trend(TrendResult),
    Partition(PartitionResult),
}

impl MetricResult {
    pub fn descriptor(&self) -> &MetricDescriptor {
        match self {
            Self::Value(result) => &result.descriptor,
            Self::Trend(result) => &result.descriptor,
            Self::Partition(result) => &result.descriptor,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Trend(_) => "trend",
            Self::Partition(_) => "partition",
        }
    }
}
