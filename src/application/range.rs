//! Range token resolution.
//!
//! A token resolves in order: an exact, case-sensitive lookup in the macro
//! registry, then a bare day count, then an ISO-8601 duration. Anything else
//! is an [`RangeError::InvalidRangeToken`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Days};
use chrono_tz::Tz;
use tracing::debug;

use crate::domain::calendar::{
    end_of_day, start_of_day, start_of_hour, start_of_minute, start_of_month, start_of_quarter,
    start_of_week, start_of_year,
};
use crate::domain::{DateRange, DomainError, Interval, IntervalUnit};
use crate::error::{RangeError, Result};
use crate::port::outbound::clock::Clock;

/// Aliases may point at other aliases up to this depth.
const MAX_ALIAS_DEPTH: usize = 8;

/// A pure function from "now" to a window. `Ok(None)` means unconstrained.
pub type RangeFactory = Arc<dyn Fn(DateTime<Tz>) -> Result<Option<DateRange>> + Send + Sync>;

/// Ranges every resolver knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRange {
    Today,
    Yesterday,
    WeekToDate,
    MonthToDate,
    QuarterToDate,
    YearToDate,
    All,
    /// From the start of the unit one unit ago until now.
    Rolling(IntervalUnit),
}

impl BuiltinRange {
    /// Registry names of the built-in ranges.
    pub const NAMED: [(&'static str, BuiltinRange); 14] = [
        ("today", BuiltinRange::Today),
        ("yesterday", BuiltinRange::Yesterday),
        ("WTD", BuiltinRange::WeekToDate),
        ("MTD", BuiltinRange::MonthToDate),
        ("QTD", BuiltinRange::QuarterToDate),
        ("YTD", BuiltinRange::YearToDate),
        ("ALL", BuiltinRange::All),
        ("minute", BuiltinRange::Rolling(IntervalUnit::Minute)),
        ("hour", BuiltinRange::Rolling(IntervalUnit::Hour)),
        ("day", BuiltinRange::Rolling(IntervalUnit::Day)),
        ("week", BuiltinRange::Rolling(IntervalUnit::Week)),
        ("month", BuiltinRange::Rolling(IntervalUnit::Month)),
        ("quarter", BuiltinRange::Rolling(IntervalUnit::Quarter)),
        ("year", BuiltinRange::Rolling(IntervalUnit::Year)),
    ];

    /// Window for this range as of `now`.
    ///
    /// # Errors
    /// Propagates calendar arithmetic failures.
    pub fn resolve(&self, now: &DateTime<Tz>) -> std::result::Result<Option<DateRange>, DomainError> {
        let range = match self {
            Self::Today => DateRange::new(start_of_day(now)?, now.clone(), Some(Interval::day()))?,
            Self::Yesterday => {
                let yesterday = Interval::day().sub_from(now)?;
                DateRange::new(
                    start_of_day(&yesterday)?,
                    end_of_day(&yesterday)?,
                    Some(Interval::day()),
                )?
            }
            Self::WeekToDate => {
                DateRange::new(start_of_week(now)?, now.clone(), Some(Interval::week()))?
            }
            Self::MonthToDate => {
                DateRange::new(start_of_month(now)?, now.clone(), Some(Interval::month()))?
            }
            Self::QuarterToDate => {
                DateRange::new(start_of_quarter(now)?, now.clone(), Some(Interval::quarter()))?
            }
            Self::YearToDate => {
                DateRange::new(start_of_year(now)?, now.clone(), Some(Interval::year()))?
            }
            Self::All => return Ok(None),
            Self::Rolling(unit) => {
                let step = Interval::new(1, *unit)?;
                let ago = step.sub_from(now)?;
                let start = match unit {
                    IntervalUnit::Minute => start_of_minute(&ago)?,
                    IntervalUnit::Hour => start_of_hour(&ago)?,
                    _ => start_of_day(&ago)?,
                };
                DateRange::new(start, now.clone(), Some(step))?
            }
        };
        Ok(Some(range))
    }
}

/// Entry in the resolver's registry.
#[derive(Clone)]
pub enum RangeMacro {
    Builtin(BuiltinRange),
    /// Resolves another token in its place.
    Alias(String),
    Custom(RangeFactory),
}

impl fmt::Debug for RangeMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(range) => f.debug_tuple("Builtin").field(range).finish(),
            Self::Alias(token) => f.debug_tuple("Alias").field(token).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Turns range tokens into zoned windows.
///
/// The registry is populated with the built-in ranges and can be extended
/// with [`RangeResolver::register`] and [`RangeResolver::alias`]. Once built
/// it is read-only and can be shared behind an `Arc`.
pub struct RangeResolver {
    clock: Arc<dyn Clock>,
    macros: HashMap<String, RangeMacro>,
}

impl RangeResolver {
    /// A resolver with every built-in range registered.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let macros = BuiltinRange::NAMED
            .iter()
            .map(|(name, range)| ((*name).to_string(), RangeMacro::Builtin(*range)))
            .collect();
        Self { clock, macros }
    }

    /// Add or replace a named range.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(DateTime<Tz>) -> Result<Option<DateRange>> + Send + Sync + 'static,
    {
        self.macros
            .insert(name.into(), RangeMacro::Custom(Arc::new(factory)));
    }

    /// Add or replace a name that resolves to another token.
    pub fn alias(&mut self, name: impl Into<String>, token: impl Into<String>) {
        self.macros.insert(name.into(), RangeMacro::Alias(token.into()));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolve `token` against the clock's current time in `tz`.
    ///
    /// # Errors
    /// Returns [`RangeError::InvalidRangeToken`] for unknown tokens and
    /// propagates calendar and factory errors.
    pub fn resolve(&self, token: &str, tz: Tz) -> Result<Option<DateRange>> {
        self.resolve_at(token, &self.clock.now_in(tz))
    }

    /// Resolve `token` as of `now`.
    ///
    /// # Errors
    /// See [`RangeResolver::resolve`].
    pub fn resolve_at(&self, token: &str, now: &DateTime<Tz>) -> Result<Option<DateRange>> {
        let range = self.resolve_with_depth(token, now, 0)?;
        debug!(
            token,
            tz = %now.timezone(),
            range = %range.as_ref().map_or_else(|| "unbounded".to_string(), ToString::to_string),
            "Resolved range token"
        );
        Ok(range)
    }

    fn resolve_with_depth(
        &self,
        token: &str,
        now: &DateTime<Tz>,
        depth: usize,
    ) -> Result<Option<DateRange>> {
        if let Some(entry) = self.macros.get(token) {
            return match entry {
                RangeMacro::Builtin(range) => Ok(range.resolve(now)?),
                RangeMacro::Custom(factory) => factory(now.clone()),
                RangeMacro::Alias(target) if depth >= MAX_ALIAS_DEPTH => {
                    Err(invalid(token, format!("alias chain through '{target}' is too deep")))
                }
                RangeMacro::Alias(target) => self.resolve_with_depth(target, now, depth + 1),
            };
        }

        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            return days_back(token, now).map(Some);
        }

        match Interval::parse_iso8601(token) {
            Ok(interval) => {
                let start = interval.sub_from(now)?;
                Ok(Some(DateRange::new(start, now.clone(), Some(interval))?))
            }
            Err(reason) if token.trim_start().starts_with(['P', 'p']) => Err(invalid(token, reason)),
            Err(_) => Err(invalid(
                token,
                "expected a registered range, a day count or an ISO-8601 duration",
            )),
        }
    }
}

/// `N` calendar days back from the start of today through the end of today.
fn days_back(token: &str, now: &DateTime<Tz>) -> Result<DateRange> {
    let days: u32 = token
        .parse()
        .map_err(|_| invalid(token, "day count is too large"))?;
    let first = now
        .clone()
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| DomainError::overflow(format!("{now} - {days} days")))?;
    let step = Interval::new(days.max(1), IntervalUnit::Day)?;
    Ok(DateRange::new(start_of_day(&first)?, end_of_day(now)?, Some(step))?)
}

fn invalid(token: &str, reason: impl Into<String>) -> crate::error::Error {
    RangeError::InvalidRangeToken {
        token: token.to_string(),
        reason: reason.into(),
    }
    .into()
}
