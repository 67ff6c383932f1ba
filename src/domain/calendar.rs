//! Truncation helpers for zoned timestamps.
//!
//! Every helper works on local wall-clock time and maps the result back into
//! the same timezone. When a truncated local time falls into a DST gap the
//! first valid instant after it is used instead.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;

use super::error::DomainError;

/// Map a local wall-clock time into `tz`.
///
/// Ambiguous times resolve to the earlier instant. Times that do not exist
/// are moved forward in 15 minute steps until a valid instant is found.
///
/// # Errors
/// Returns [`DomainError::CalendarArithmeticOverflow`] when no valid
/// instant exists within a few hours of `naive`.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, DomainError> {
    let mut candidate = naive;
    for _ in 0..=16 {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return Ok(dt);
        }
        candidate = candidate
            .checked_add_signed(TimeDelta::minutes(15))
            .ok_or_else(|| DomainError::overflow(format!("localize {naive} in {tz}")))?;
    }
    Err(DomainError::overflow(format!("localize {naive} in {tz}")))
}

/// Local midnight of `date` in `tz`.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, DomainError> {
    localize(date.and_time(NaiveTime::MIN), tz)
}

pub fn start_of_minute(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let local = at.naive_local();
    let truncated = local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| DomainError::overflow(format!("start of minute {at}")))?;
    localize(truncated, at.timezone())
}

pub fn start_of_hour(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let local = at.naive_local();
    let truncated = local
        .date()
        .and_hms_opt(local.hour(), 0, 0)
        .ok_or_else(|| DomainError::overflow(format!("start of hour {at}")))?;
    localize(truncated, at.timezone())
}

pub fn start_of_day(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    local_midnight(at.date_naive(), at.timezone())
}

/// The last microsecond of the local day containing `at`.
pub fn end_of_day(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let tomorrow = at
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| DomainError::overflow(format!("end of day {at}")))?;
    let next_midnight = local_midnight(tomorrow, at.timezone())?;
    next_midnight
        .checked_sub_signed(TimeDelta::microseconds(1))
        .ok_or_else(|| DomainError::overflow(format!("end of day {at}")))
}

/// Midnight of the Monday starting the ISO week containing `at`.
pub fn start_of_week(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let date = at.date_naive();
    let monday = date
        .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .ok_or_else(|| DomainError::overflow(format!("start of week {at}")))?;
    local_midnight(monday, at.timezone())
}

pub fn start_of_month(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let date = at
        .date_naive()
        .with_day(1)
        .ok_or_else(|| DomainError::overflow(format!("start of month {at}")))?;
    local_midnight(date, at.timezone())
}

pub fn start_of_quarter(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let quarter_start_month = ((at.month() - 1) / 3) * 3 + 1;
    let date = NaiveDate::from_ymd_opt(at.year(), quarter_start_month, 1)
        .ok_or_else(|| DomainError::overflow(format!("start of quarter {at}")))?;
    local_midnight(date, at.timezone())
}

pub fn start_of_year(at: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
    let date = NaiveDate::from_ymd_opt(at.year(), 1, 1)
        .ok_or_else(|| DomainError::overflow(format!("start of year {at}")))?;
    local_midnight(date, at.timezone())
}
