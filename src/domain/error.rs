//! Domain validation errors for calendar types.
//!
//! This module defines errors that occur when domain invariants are violated.
//! These errors are returned by constructors and stepping operations on
//! [`Interval`](super::interval::Interval) and
//! [`DateRange`](super::range::DateRange).
//!
//! # Examples
//!
//! Handling validation errors:
//!
//! ```
//! use dashmetrics::domain::error::DomainError;
//! use dashmetrics::domain::interval::{Interval, IntervalUnit};
//!
//! // Zero-length steps are rejected
//! let result = Interval::new(0, IntervalUnit::Day);
//!
//! assert!(matches!(result, Err(DomainError::NonPositiveInterval)));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Intervals must move time forward by a non-zero amount.
    #[error("interval must be strictly positive")]
    NonPositiveInterval,

    /// A range must not end before it starts.
    #[error("range end {end} is before start {start}")]
    InvertedRange {
        /// The start that was provided.
        start: String,
        /// The end that was provided.
        end: String,
    },

    /// Calendar arithmetic left the representable range or produced a
    /// local time that does not exist.
    #[error("calendar arithmetic overflow: {operation}")]
    CalendarArithmeticOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
}

impl DomainError {
    pub(crate) fn overflow(operation: impl Into<String>) -> Self {
        Self::CalendarArithmeticOverflow {
            operation: operation.into(),
        }
    }
}
