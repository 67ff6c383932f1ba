//! Calendar-aware step amounts.
//!
//! An [`Interval`] is stored as three non-negative components: calendar
//! months, calendar days and exact microseconds. Adding an interval applies
//! the components in that order so that month arithmetic clamps to the end of
//! the target month and day arithmetic preserves the local wall-clock time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, TimeDelta, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::DomainError;

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: u64 = 24 * MICROS_PER_HOUR;

/// Calendar unit an interval can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl IntervalUnit {
    /// Lowercase name of the unit.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strictly positive calendar duration.
///
/// Two intervals are equal when their normalized components are equal, so
/// `P7D` and `P1W` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    months: u32,
    days: u32,
    micros: u64,
}

impl Interval {
    /// Build an interval of `amount` units.
    ///
    /// # Errors
    /// Returns [`DomainError::NonPositiveInterval`] when `amount` is zero and
    /// [`DomainError::CalendarArithmeticOverflow`] when the amount does not
    /// fit the component it maps to.
    pub fn new(amount: u32, unit: IntervalUnit) -> Result<Self, DomainError> {
        let overflow = || DomainError::overflow(format!("{amount} {unit}s"));
        let (months, days, micros) = match unit {
            IntervalUnit::Minute => (0, 0, u64::from(amount) * MICROS_PER_MINUTE),
            IntervalUnit::Hour => (0, 0, u64::from(amount) * MICROS_PER_HOUR),
            IntervalUnit::Day => (0, amount, 0),
            IntervalUnit::Week => (0, amount.checked_mul(7).ok_or_else(overflow)?, 0),
            IntervalUnit::Month => (amount, 0, 0),
            IntervalUnit::Quarter => (amount.checked_mul(3).ok_or_else(overflow)?, 0, 0),
            IntervalUnit::Year => (amount.checked_mul(12).ok_or_else(overflow)?, 0, 0),
        };
        Self::from_components(months, days, micros)
    }

    /// Build an interval from raw components.
    ///
    /// # Errors
    /// Returns [`DomainError::NonPositiveInterval`] when every component is zero.
    pub fn from_components(months: u32, days: u32, micros: u64) -> Result<Self, DomainError> {
        if months == 0 && days == 0 && micros == 0 {
            return Err(DomainError::NonPositiveInterval);
        }
        Ok(Self {
            months,
            days,
            micros,
        })
    }

    /// One minute.
    #[must_use]
    pub const fn minute() -> Self {
        Self {
            months: 0,
            days: 0,
            micros: MICROS_PER_MINUTE,
        }
    }

    /// One hour.
    #[must_use]
    pub const fn hour() -> Self {
        Self {
            months: 0,
            days: 0,
            micros: MICROS_PER_HOUR,
        }
    }

    /// One calendar day.
    #[must_use]
    pub const fn day() -> Self {
        Self {
            months: 0,
            days: 1,
            micros: 0,
        }
    }

    /// One week (seven calendar days).
    #[must_use]
    pub const fn week() -> Self {
        Self {
            months: 0,
            days: 7,
            micros: 0,
        }
    }

    /// One calendar month.
    #[must_use]
    pub const fn month() -> Self {
        Self {
            months: 1,
            days: 0,
            micros: 0,
        }
    }

    /// Three calendar months.
    #[must_use]
    pub const fn quarter() -> Self {
        Self {
            months: 3,
            days: 0,
            micros: 0,
        }
    }

    /// Twelve calendar months.
    #[must_use]
    pub const fn year() -> Self {
        Self {
            months: 12,
            days: 0,
            micros: 0,
        }
    }

    #[must_use]
    pub const fn months(&self) -> u32 {
        self.months
    }

    #[must_use]
    pub const fn days(&self) -> u32 {
        self.days
    }

    #[must_use]
    pub const fn micros(&self) -> u64 {
        self.micros
    }

    /// The largest single unit that represents this interval exactly.
    ///
    /// Returns `None` for mixed intervals such as `P1M2D`.
    #[must_use]
    pub fn unit(&self) -> Option<(u32, IntervalUnit)> {
        match (self.months, self.days, self.micros) {
            (m, 0, 0) if m % 12 == 0 => Some((m / 12, IntervalUnit::Year)),
            (m, 0, 0) if m % 3 == 0 => Some((m / 3, IntervalUnit::Quarter)),
            (m, 0, 0) => Some((m, IntervalUnit::Month)),
            (0, d, 0) if d % 7 == 0 => Some((d / 7, IntervalUnit::Week)),
            (0, d, 0) => Some((d, IntervalUnit::Day)),
            (0, 0, us) if us % MICROS_PER_HOUR == 0 => u32::try_from(us / MICROS_PER_HOUR)
                .ok()
                .map(|n| (n, IntervalUnit::Hour)),
            (0, 0, us) if us % MICROS_PER_MINUTE == 0 => u32::try_from(us / MICROS_PER_MINUTE)
                .ok()
                .map(|n| (n, IntervalUnit::Minute)),
            _ => None,
        }
    }

    /// Multiply every component by `factor`.
    ///
    /// # Errors
    /// Returns [`DomainError::NonPositiveInterval`] for a zero factor and
    /// [`DomainError::CalendarArithmeticOverflow`] when a component overflows.
    pub fn times(&self, factor: u32) -> Result<Self, DomainError> {
        let overflow = || DomainError::overflow(format!("{self} x {factor}"));
        Self::from_components(
            self.months.checked_mul(factor).ok_or_else(overflow)?,
            self.days.checked_mul(factor).ok_or_else(overflow)?,
            self.micros
                .checked_mul(u64::from(factor))
                .ok_or_else(overflow)?,
        )
    }

    /// Add this interval to `at`.
    ///
    /// Months are applied first and clamp to the last valid day of the
    /// target month, then calendar days on the local date, then elapsed time.
    ///
    /// # Errors
    /// Returns [`DomainError::CalendarArithmeticOverflow`] when the result is
    /// out of range or does not exist in the local timezone.
    pub fn add_to<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
        let overflow = || DomainError::overflow(format!("{at:?} + {self}"));
        let mut out = at.clone();
        if self.months > 0 {
            out = out
                .checked_add_months(Months::new(self.months))
                .ok_or_else(overflow)?;
        }
        if self.days > 0 {
            out = out
                .checked_add_days(Days::new(u64::from(self.days)))
                .ok_or_else(overflow)?;
        }
        if self.micros > 0 {
            out = out
                .checked_add_signed(self.elapsed().ok_or_else(overflow)?)
                .ok_or_else(overflow)?;
        }
        Ok(out)
    }

    /// Subtract this interval from `at`, undoing [`Interval::add_to`]
    /// component by component in reverse order.
    ///
    /// # Errors
    /// Returns [`DomainError::CalendarArithmeticOverflow`] when the result is
    /// out of range or does not exist in the local timezone.
    pub fn sub_from<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
        let overflow = || DomainError::overflow(format!("{at:?} - {self}"));
        let mut out = at.clone();
        if self.micros > 0 {
            out = out
                .checked_sub_signed(self.elapsed().ok_or_else(overflow)?)
                .ok_or_else(overflow)?;
        }
        if self.days > 0 {
            out = out
                .checked_sub_days(Days::new(u64::from(self.days)))
                .ok_or_else(overflow)?;
        }
        if self.months > 0 {
            out = out
                .checked_sub_months(Months::new(self.months))
                .ok_or_else(overflow)?;
        }
        Ok(out)
    }

    /// The interval spanned by `[start, end]`.
    ///
    /// Normalized to whole months when `start + n months == end`, to whole
    /// days when the elapsed time is a multiple of 24 hours, and to elapsed
    /// microseconds otherwise.
    ///
    /// # Errors
    /// Returns [`DomainError::NonPositiveInterval`] when `end <= start`.
    pub fn between<Tz: TimeZone>(
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<Self, DomainError> {
        use chrono::Datelike;

        if end <= start {
            return Err(DomainError::NonPositiveInterval);
        }

        let (from, to) = (start.naive_local(), end.naive_local());
        let month_span =
            (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
        if let Ok(months) = u32::try_from(month_span) {
            if months > 0 && start.clone().checked_add_months(Months::new(months)).as_ref() == Some(end)
            {
                return Self::from_components(months, 0, 0);
            }
        }

        let elapsed = end.clone().signed_duration_since(start.clone());
        let micros = elapsed
            .num_microseconds()
            .and_then(|us| u64::try_from(us).ok())
            .ok_or_else(|| DomainError::overflow(format!("{start:?} .. {end:?}")))?;

        if micros % MICROS_PER_DAY == 0 {
            let days = u32::try_from(micros / MICROS_PER_DAY)
                .map_err(|_| DomainError::overflow(format!("{start:?} .. {end:?}")))?;
            return Self::from_components(0, days, 0);
        }

        Self::from_components(0, 0, micros)
    }

    fn elapsed(&self) -> Option<TimeDelta> {
        i64::try_from(self.micros)
            .ok()
            .map(TimeDelta::microseconds)
    }

    /// Parse an ISO-8601 duration such as `P1Y2M`, `P5W` or `PT90M`.
    ///
    /// Designators are case-insensitive. Only the seconds component may carry
    /// a fraction.
    ///
    /// # Errors
    /// Returns a human readable reason when the text is not a valid duration.
    pub fn parse_iso8601(input: &str) -> Result<Self, String> {
        let upper = input.trim().to_ascii_uppercase();
        let body = upper
            .strip_prefix('P')
            .ok_or_else(|| "duration must start with 'P'".to_string())?;
        if body.is_empty() {
            return Err("duration has no components".into());
        }

        let (date_part, time_part) = match body.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (body, None),
        };
        if time_part == Some("") {
            return Err("time designator 'T' must be followed by components".into());
        }

        let mut months: u64 = 0;
        let mut days: u64 = 0;
        let mut micros: u64 = 0;
        let overflow = || "duration component is too large".to_string();

        for (value, designator) in components(date_part, &['Y', 'M', 'W', 'D'])? {
            let whole = whole_number(&value)?;
            match designator {
                'Y' => months = whole.checked_mul(12).and_then(|m| months.checked_add(m)).ok_or_else(overflow)?,
                'M' => months = months.checked_add(whole).ok_or_else(overflow)?,
                'W' => days = whole.checked_mul(7).and_then(|d| days.checked_add(d)).ok_or_else(overflow)?,
                _ => days = days.checked_add(whole).ok_or_else(overflow)?,
            }
        }

        if let Some(time) = time_part {
            for (value, designator) in components(time, &['H', 'M', 'S'])? {
                let amount = match designator {
                    'H' => whole_number(&value)?.checked_mul(MICROS_PER_HOUR),
                    'M' => whole_number(&value)?.checked_mul(MICROS_PER_MINUTE),
                    _ => seconds_to_micros(&value)?,
                };
                micros = amount
                    .and_then(|us| micros.checked_add(us))
                    .ok_or_else(overflow)?;
            }
        }

        let months = u32::try_from(months).map_err(|_| overflow())?;
        let days = u32::try_from(days).map_err(|_| overflow())?;
        Self::from_components(months, days, micros).map_err(|e| e.to_string())
    }
}

/// Split `text` into `(number, designator)` pairs, enforcing the designator
/// order given in `allowed`.
fn components(text: &str, allowed: &[char]) -> Result<Vec<(String, char)>, String> {
    let mut out = Vec::new();
    let mut digits = String::new();
    let mut next_allowed = 0;

    for ch in text.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            digits.push(if ch == ',' { '.' } else { ch });
            continue;
        }
        let position = allowed[next_allowed..]
            .iter()
            .position(|d| *d == ch)
            .ok_or_else(|| format!("unexpected designator '{ch}'"))?;
        if digits.is_empty() {
            return Err(format!("designator '{ch}' has no value"));
        }
        out.push((std::mem::take(&mut digits), ch));
        next_allowed += position + 1;
    }

    if !digits.is_empty() {
        return Err(format!("value '{digits}' has no designator"));
    }
    Ok(out)
}

fn whole_number(value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("'{value}' is not a whole number"))
}

fn seconds_to_micros(value: &str) -> Result<Option<u64>, String> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() || fraction.len() > 6 || value.matches('.').count() > 1 {
        return Err(format!("'{value}' is not a valid seconds value"));
    }
    let whole = whole_number(whole)?;
    let fraction = if fraction.is_empty() {
        0
    } else {
        whole_number(&format!("{fraction:0<6}"))?
    };
    Ok(whole
        .checked_mul(MICROS_PER_SECOND)
        .and_then(|us| us.checked_add(fraction)))
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("P")?;
        let (years, months) = (self.months / 12, self.months % 12);
        if years > 0 {
            write!(f, "{years}Y")?;
        }
        if months > 0 {
            write!(f, "{months}M")?;
        }
        if self.days > 0 {
            if self.days % 7 == 0 && self.months == 0 && self.micros == 0 {
                write!(f, "{}W", self.days / 7)?;
            } else {
                write!(f, "{}D", self.days)?;
            }
        }
        if self.micros > 0 {
            f.write_str("T")?;
            let hours = self.micros / MICROS_PER_HOUR;
            let minutes = (self.micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
            let micros = self.micros % MICROS_PER_MINUTE;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if micros > 0 {
                let (secs, frac) = (micros / MICROS_PER_SECOND, micros % MICROS_PER_SECOND);
                if frac == 0 {
                    write!(f, "{secs}S")?;
                } else {
                    let frac = format!("{frac:06}");
                    write!(f, "{secs}.{}S", frac.trim_end_matches('0'))?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_iso8601(s)
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
