//! A [`DataSource`] over records held in memory.
//!
//! Bucket groups are evaluated in Rust from the expression's column, unit and
//! offset, producing the same keys a SQL engine returns for the generated
//! expression. The SQL text itself is ignored.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{bucket_key, AggregateFunction};
use crate::error::Result;
use crate::port::outbound::source::{
    Between, DataSource, GroupKey, GroupedQuery, GroupedRow, ScalarQuery,
};

/// One row: a timestamp plus numeric and text columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    pub created_at: DateTime<Utc>,
    pub values: HashMap<String, f64>,
    pub labels: HashMap<String, String>,
}

impl MemoryRecord {
    #[must_use]
    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            values: HashMap::new(),
            labels: HashMap::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    #[must_use]
    pub fn label(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(column.into(), value.into());
        self
    }
}

/// In-memory table. Every date column resolves to the record's
/// `created_at`.
pub struct MemorySource {
    backend: String,
    key_column: String,
    created_at_column: String,
    records: RwLock<Vec<MemoryRecord>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    /// An empty source that asks for SQLite expressions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: "sqlite".into(),
            key_column: "id".into(),
            created_at_column: "created_at".into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Report a different backend, which changes the expression dialect
    /// the trend aggregator generates.
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = MemoryRecord>) -> Self {
        self.records.write().extend(records);
        self
    }

    pub fn insert(&self, record: MemoryRecord) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn in_window(record: &MemoryRecord, between: Option<&Between>) -> bool {
        between.map_or(true, |b| b.start <= record.created_at && record.created_at <= b.end)
    }

    /// The value `function` sees for `column`. Counting only needs the
    /// column to be present.
    fn column_value(
        &self,
        record: &MemoryRecord,
        column: &str,
        function: AggregateFunction,
    ) -> Option<f64> {
        if let Some(value) = record.values.get(column) {
            return Some(*value);
        }
        let present = column == self.key_column
            || column == self.created_at_column
            || record.labels.contains_key(column);
        (function == AggregateFunction::Count && present).then_some(1.0)
    }

    fn group_key(record: &MemoryRecord, group: &GroupKey) -> String {
        match group {
            GroupKey::Column(column) => record
                .labels
                .get(column)
                .cloned()
                .or_else(|| record.values.get(column).map(f64::to_string))
                .unwrap_or_default(),
            GroupKey::Bucket(expression) => {
                let utc = record.created_at.naive_utc();
                let local = utc
                    .checked_add_signed(TimeDelta::seconds(i64::from(expression.offset_seconds)))
                    .unwrap_or(utc);
                bucket_key(&local, expression.unit)
            }
        }
    }
}

impl DataSource for MemorySource {
    fn backend(&self) -> &str {
        &self.backend
    }

    fn key_column(&self) -> &str {
        &self.key_column
    }

    fn created_at_column(&self) -> &str {
        &self.created_at_column
    }

    fn aggregate(&self, query: &ScalarQuery) -> Result<Option<f64>> {
        let records = self.records.read();
        let values: Vec<f64> = records
            .iter()
            .filter(|record| Self::in_window(record, query.between.as_ref()))
            .filter_map(|record| self.column_value(record, &query.column, query.function))
            .collect();
        debug!(
            function = %query.function,
            column = %query.column,
            matched = values.len(),
            "Evaluated scalar aggregate in memory"
        );
        Ok(query.function.apply(&values))
    }

    fn grouped(&self, query: &GroupedQuery) -> Result<Vec<GroupedRow>> {
        let records = self.records.read();
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|record| Self::in_window(record, query.between.as_ref()))
        {
            let values = groups.entry(Self::group_key(record, &query.group)).or_default();
            if let Some(value) = self.column_value(record, &query.column, query.function) {
                values.push(value);
            }
        }
        debug!(
            function = %query.function,
            column = %query.column,
            groups = groups.len(),
            "Evaluated grouped aggregate in memory"
        );
        Ok(groups
            .into_iter()
            .map(|(key, values)| GroupedRow::new(key, query.function.apply(&values)))
            .collect())
    }
}
