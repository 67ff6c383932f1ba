//! Aggregate functions a metric can apply to a column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// SQL function name.
    #[must_use]
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Apply the function to non-null values, with SQL semantics: `COUNT` of
    /// nothing is zero, everything else of nothing is `None`.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if let Self::Count = self {
            return Some(values.len() as f64);
        }
        if values.is_empty() {
            return None;
        }
        let total: f64 = values.iter().sum();
        Some(match self {
            Self::Count => values.len() as f64,
            Self::Sum => total,
            Self::Avg => total / values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        })
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "avg" | "average" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown aggregate function '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_sql_semantics() {
        let values = [4.0, 1.0, 7.0];
        assert_eq!(AggregateFunction::Count.apply(&values), Some(3.0));
        assert_eq!(AggregateFunction::Sum.apply(&values), Some(12.0));
        assert_eq!(AggregateFunction::Avg.apply(&values), Some(4.0));
        assert_eq!(AggregateFunction::Min.apply(&values), Some(1.0));
        assert_eq!(AggregateFunction::Max.apply(&values), Some(7.0));
    }

    #[test]
    fn empty_input_counts_zero_and_sums_nothing() {
        assert_eq!(AggregateFunction::Count.apply(&[]), Some(0.0));
        assert_eq!(AggregateFunction::Sum.apply(&[]), None);
        assert_eq!(AggregateFunction::Max.apply(&[]), None);
    }

    #[test]
    fn parses_and_prints_names() {
        assert_eq!("AVERAGE".parse::<AggregateFunction>().unwrap(), AggregateFunction::Avg);
        assert_eq!(AggregateFunction::Sum.to_string(), "sum");
        assert_eq!(AggregateFunction::Sum.sql_name(), "SUM");
    }
}
