use super::{Shift, TrendDateDialect};
use crate::domain::TrendUnit;

/// SQLite `strftime` with a time modifier. ISO weeks need SQLite 3.46+.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl TrendDateDialect for SqliteDialect {
    fn expression(&self, column: &str, unit: TrendUnit, offset_seconds: i32) -> String {
        let format = match unit {
            TrendUnit::Month => "%Y-%m",
            TrendUnit::Week => "%G-%V",
            TrendUnit::Day => "%Y-%m-%d",
            TrendUnit::Hour => "%Y-%m-%d %H:00",
            TrendUnit::Minute => "%Y-%m-%d %H:%M:00",
        };
        match Shift::from_seconds(offset_seconds) {
            Shift::None => format!("strftime('{format}', {column})"),
            Shift::Hours(hours) => format!("strftime('{format}', {column}, '{hours:+} hours')"),
            Shift::Minutes(minutes) => {
                format!("strftime('{format}', {column}, '{minutes:+} minutes')")
            }
        }
    }
}
