//! Trend units, bucket keys and bucket labels.
//!
//! A bucket key is the truncation string a query engine groups rows by:
//!
//! | unit   | key                   |
//! |--------|-----------------------|
//! | month  | `YYYY-MM`             |
//! | week   | `IYYY-IW` (ISO)       |
//! | day    | `YYYY-MM-DD`          |
//! | hour   | `YYYY-MM-DD HH:00`    |
//! | minute | `YYYY-MM-DD HH:MM:00` |
//!
//! Keys are parsed back into local wall-clock time so they can be relabeled
//! with the same formatter that built the zero-filled skeleton.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use super::interval::Interval;
use crate::error::ExpressionError;

/// Granularity of a trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendUnit {
    Month,
    Week,
    Day,
    Hour,
    Minute,
}

impl TrendUnit {
    pub const ALL: [TrendUnit; 5] = [
        TrendUnit::Month,
        TrendUnit::Week,
        TrendUnit::Day,
        TrendUnit::Hour,
        TrendUnit::Minute,
    ];

    /// Lowercase name; also the name of the unit's rolling range macro.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }

    /// Width of one bucket.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        match self {
            Self::Month => Interval::month(),
            Self::Week => Interval::week(),
            Self::Day => Interval::day(),
            Self::Hour => Interval::hour(),
            Self::Minute => Interval::minute(),
        }
    }
}

impl fmt::Display for TrendUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            "day" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            other => Err(format!(
                "unknown trend unit '{other}' (expected month, week, day, hour or minute)"
            )),
        }
    }
}

/// The bucket key a local timestamp falls into.
#[must_use]
pub fn bucket_key(local: &NaiveDateTime, unit: TrendUnit) -> String {
    match unit {
        TrendUnit::Month => local.format("%Y-%m").to_string(),
        TrendUnit::Week => {
            let week = local.iso_week();
            format!("{}-{:02}", week.year(), week.week())
        }
        TrendUnit::Day => local.format("%Y-%m-%d").to_string(),
        TrendUnit::Hour => local.format("%Y-%m-%d %H:00").to_string(),
        TrendUnit::Minute => local.format("%Y-%m-%d %H:%M:00").to_string(),
    }
}

/// Parse a bucket key back to the local start of its bucket.
///
/// Weeks parse to the Monday of the ISO week. Unpadded week numbers are
/// accepted since some engines do not pad them.
///
/// # Errors
/// Returns [`ExpressionError::MalformedBucketKey`] when `key` is not in the
/// shape produced for `unit`.
pub fn parse_bucket_key(key: &str, unit: TrendUnit) -> Result<NaiveDateTime, ExpressionError> {
    let malformed = || ExpressionError::MalformedBucketKey {
        key: key.to_string(),
        unit: unit.to_string(),
    };
    let key = key.trim();

    let parsed = match unit {
        TrendUnit::Month => NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN)),
        TrendUnit::Week => key.rsplit_once('-').and_then(|(year, week)| {
            let year = year.parse::<i32>().ok()?;
            let week = week.parse::<u32>().ok()?;
            NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
        })
        .map(|d| d.and_time(NaiveTime::MIN)),
        TrendUnit::Day => NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN)),
        TrendUnit::Hour => NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M")
            .ok()
            .filter(|dt| dt.minute() == 0),
        TrendUnit::Minute => NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M:%S")
            .ok()
            .filter(|dt| dt.second() == 0),
    };

    parsed.ok_or_else(malformed)
}

/// Display label for the bucket starting at `local`.
///
/// Labels are unique within one trend and sort in the same order as the
/// buckets they name when read left to right on a chart.
#[must_use]
pub fn bucket_label(local: &NaiveDateTime, unit: TrendUnit, twelve_hour_time: bool) -> String {
    match unit {
        TrendUnit::Month => local.format("%B %Y").to_string(),
        TrendUnit::Week => {
            let date = local.date();
            let monday = date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
                .unwrap_or(date);
            let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
            format!("{} - {}", monday.format("%B %-d"), sunday.format("%B %-d"))
        }
        TrendUnit::Day => local.format("%B %-d, %Y").to_string(),
        TrendUnit::Hour if twelve_hour_time => local.format("%B %-d - %-I:00 %p").to_string(),
        TrendUnit::Hour => local.format("%B %-d - %-H:00").to_string(),
        TrendUnit::Minute if twelve_hour_time => local.format("%B %-d - %-I:%M %p").to_string(),
        TrendUnit::Minute => local.format("%B %-d - %-H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn keys_match_engine_formats() {
        let at = local(2024, 3, 5, 14, 5);
        assert_eq!(bucket_key(&at, TrendUnit::Month), "2024-03");
        assert_eq!(bucket_key(&at, TrendUnit::Week), "2024-10");
        assert_eq!(bucket_key(&at, TrendUnit::Day), "2024-03-05");
        assert_eq!(bucket_key(&at, TrendUnit::Hour), "2024-03-05 14:00");
        assert_eq!(bucket_key(&at, TrendUnit::Minute), "2024-03-05 14:05:00");
    }

    #[test]
    fn week_key_uses_iso_year() {
        // Dec 30 2024 belongs to ISO week 1 of 2025.
        assert_eq!(bucket_key(&local(2024, 12, 30, 0, 0), TrendUnit::Week), "2025-01");
        // Jan 1 2021 belongs to ISO week 53 of 2020.
        assert_eq!(bucket_key(&local(2021, 1, 1, 0, 0), TrendUnit::Week), "2020-53");
    }

    #[test]
    fn keys_parse_back_to_bucket_start() {
        let at = local(2024, 3, 5, 14, 5);
        for unit in TrendUnit::ALL {
            let key = bucket_key(&at, unit);
            let start = parse_bucket_key(&key, unit).unwrap();
            assert_eq!(bucket_key(&start, unit), key, "unit {unit}");
        }
        assert_eq!(
            parse_bucket_key("2024-10", TrendUnit::Week).unwrap(),
            local(2024, 3, 4, 0, 0)
        );
    }

    #[test]
    fn unpadded_week_is_accepted() {
        assert_eq!(
            parse_bucket_key("2024-3", TrendUnit::Week).unwrap(),
            parse_bucket_key("2024-03", TrendUnit::Week).unwrap()
        );
    }

    #[test]
    fn malformed_key_is_rejected() {
        let err = parse_bucket_key("March", TrendUnit::Day).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::MalformedBucketKey {
                key: "March".into(),
                unit: "day".into()
            }
        );
        assert!(parse_bucket_key("2024-03-05 14:30", TrendUnit::Hour).is_err());
    }

    #[test]
    fn labels_follow_unit_formats() {
        let at = local(2024, 3, 5, 14, 5);
        assert_eq!(bucket_label(&at, TrendUnit::Month, true), "March 2024");
        assert_eq!(bucket_label(&at, TrendUnit::Week, true), "March 4 - March 10");
        assert_eq!(bucket_label(&at, TrendUnit::Day, true), "March 5, 2024");
        assert_eq!(bucket_label(&at, TrendUnit::Hour, true), "March 5 - 2:00 PM");
        assert_eq!(bucket_label(&at, TrendUnit::Hour, false), "March 5 - 14:00");
        assert_eq!(bucket_label(&at, TrendUnit::Minute, true), "March 5 - 2:05 PM");
        assert_eq!(bucket_label(&at, TrendUnit::Minute, false), "March 5 - 14:05");
    }

    #[test]
    fn parses_unit_names() {
        assert_eq!("Week".parse::<TrendUnit>().unwrap(), TrendUnit::Week);
        assert!("fortnight".parse::<TrendUnit>().is_err());
    }
}
