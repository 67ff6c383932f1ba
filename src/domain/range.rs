//! Zoned date windows that step forward and backward without drift.

use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::error::DomainError;
use super::interval::Interval;

/// An inclusive `[start, end]` window in a concrete timezone plus the step
/// used to move it.
///
/// Stepped windows are computed from the anchor the range was built from, so
/// a monthly range anchored on January 31 visits February 29 and then March
/// 31 rather than drifting to the 29th.
#[derive(Debug, Clone)]
pub struct DateRange {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    interval: Interval,
    anchor: DateTime<Tz>,
    index: i64,
}

impl DateRange {
    /// Build a range. Without an explicit interval the step is the span
    /// between `start` and `end`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvertedRange`] when `end < start`, and
    /// [`DomainError::NonPositiveInterval`] when no interval is given and the
    /// range has zero width.
    pub fn new(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        interval: Option<Interval>,
    ) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvertedRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        let interval = match interval {
            Some(interval) => interval,
            None => Interval::between(&start, &end)?,
        };
        Ok(Self {
            anchor: start.clone(),
            start,
            end,
            interval,
            index: 0,
        })
    }

    pub fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    pub fn end(&self) -> &DateTime<Tz> {
        &self.end
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// Whether `at` falls inside the window, bounds included.
    pub fn contains(&self, at: &DateTime<Tz>) -> bool {
        &self.start <= at && at <= &self.end
    }

    /// The same window re-seeded with a new step. The current start becomes
    /// the anchor for subsequent stepping.
    #[must_use]
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self {
            start: self.start.clone(),
            end: self.end.clone(),
            interval,
            anchor: self.start.clone(),
            index: 0,
        }
    }

    /// The window immediately following this one, one full step wide.
    ///
    /// # Errors
    /// Returns [`DomainError::CalendarArithmeticOverflow`] when the new
    /// bounds leave the representable range.
    pub fn next(&self) -> Result<Self, DomainError> {
        let index = self
            .index
            .checked_add(1)
            .ok_or_else(|| DomainError::overflow("range index"))?;
        let start = self.step(index)?;
        let end = one_micro_before(&self.step(index + 1)?)?;
        Ok(self.stepped(start, end, index))
    }

    /// The window immediately preceding this one. It ends one microsecond
    /// before the current start.
    ///
    /// # Errors
    /// Returns [`DomainError::CalendarArithmeticOverflow`] when the new
    /// bounds leave the representable range.
    pub fn prev(&self) -> Result<Self, DomainError> {
        let index = self
            .index
            .checked_sub(1)
            .ok_or_else(|| DomainError::overflow("range index"))?;
        let start = self.step(index)?;
        let end = one_micro_before(&self.start)?;
        Ok(self.stepped(start, end, index))
    }

    /// The window bounds converted to UTC, for querying.
    pub fn to_utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start.with_timezone(&Utc), self.end.with_timezone(&Utc))
    }

    fn stepped(&self, start: DateTime<Tz>, end: DateTime<Tz>, index: i64) -> Self {
        Self {
            start,
            end,
            interval: self.interval,
            anchor: self.anchor.clone(),
            index,
        }
    }

    /// `anchor + n * interval`, computed in one shot.
    fn step(&self, n: i64) -> Result<DateTime<Tz>, DomainError> {
        if n == 0 {
            return Ok(self.anchor.clone());
        }
        let factor = u32::try_from(n.unsigned_abs())
            .map_err(|_| DomainError::overflow(format!("{} x {n}", self.interval)))?;
        let offset = self.interval.times(factor)?;
        if n > 0 {
            offset.add_to(&self.anchor)
        } else {
            offset.sub_from(&self.anchor)
        }
    }
}

fn one_micro_before(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    at.clone()
        .checked_sub_signed(TimeDelta::microseconds(1))
        .ok_or_else(|| DomainError::overflow(format!("{at} - 1us")))
}

impl PartialEq for DateRange {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.interval == other.interval
    }
}

impl Eq for DateRange {}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {} ({})",
            self.start.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.end.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.interval
        )
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DateRange", 2)?;
        state.serialize_field(
            "start",
            &self.start.to_rfc3339_opts(SecondsFormat::Micros, true),
        )?;
        state.serialize_field("end", &self.end.to_rfc3339_opts(SecondsFormat::Micros, true))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::IntervalUnit;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        UTC.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn monthly(y: i32, m: u32, d: u32) -> DateRange {
        let start = utc(y, m, d);
        let end = Interval::month().add_to(&start).unwrap() - TimeDelta::microseconds(1);
        DateRange::new(start, end, Some(Interval::month())).unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = DateRange::new(utc(2024, 2, 1), utc(2024, 1, 1), None).unwrap_err();
        assert!(matches!(err, DomainError::InvertedRange { .. }));
    }

    #[test]
    fn default_interval_is_span_between_bounds() {
        let range = DateRange::new(utc(2024, 1, 1), utc(2024, 2, 1), None).unwrap();
        assert_eq!(range.interval(), Interval::month());
    }

    #[test]
    fn next_and_prev_are_inverses() {
        let range = monthly(2024, 1, 31);
        assert_eq!(range.next().unwrap().prev().unwrap().start(), range.start());
        assert_eq!(range.prev().unwrap().next().unwrap().start(), range.start());
    }

    #[test]
    fn month_steps_do_not_drift() {
        let range = monthly(2024, 1, 31);
        let feb = range.next().unwrap();
        let mar = feb.next().unwrap();
        assert_eq!(feb.start(), &utc(2024, 2, 29));
        assert_eq!(mar.start(), &utc(2024, 3, 31));
    }

    #[test]
    fn consecutive_windows_tile_without_gaps() {
        let mut window = DateRange::new(
            utc(2024, 1, 1),
            utc(2024, 1, 2) - TimeDelta::microseconds(1),
            Some(Interval::new(1, IntervalUnit::Day).unwrap()),
        )
        .unwrap();
        for _ in 0..40 {
            let following = window.next().unwrap();
            assert_eq!(
                following.start().clone() - window.end().clone(),
                TimeDelta::microseconds(1)
            );
            window = following;
        }
        assert_eq!(window.start(), &utc(2024, 2, 10));
    }

    #[test]
    fn prev_ends_just_before_current_start() {
        let range = monthly(2024, 3, 1);
        let before = range.prev().unwrap();
        assert_eq!(before.start(), &utc(2024, 2, 1));
        assert_eq!(
            range.start().clone() - before.end().clone(),
            TimeDelta::microseconds(1)
        );
    }

    #[test]
    fn daily_steps_keep_local_midnight_across_dst() {
        let start = New_York.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let range = DateRange::new(start.clone(), start, Some(Interval::day())).unwrap();
        let next = range.next().unwrap().next().unwrap();
        assert_eq!(next.start(), &New_York.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn equality_ignores_anchor() {
        let a = monthly(2024, 1, 1).next().unwrap();
        let b = monthly(2024, 2, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn serializes_bounds_as_rfc3339_micros() {
        let range = DateRange::new(utc(2024, 1, 1), utc(2024, 1, 2), None).unwrap();
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json["start"], "2024-01-01T00:00:00.000000Z");
        assert_eq!(json["end"], "2024-01-02T00:00:00.000000Z");
    }
}
