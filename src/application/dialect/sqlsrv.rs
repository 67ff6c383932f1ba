use super::{Shift, TrendDateDialect};
use crate::domain::TrendUnit;

/// SQL Server `FORMAT` over `DATEADD`.
///
/// `FORMAT` has no ISO week pattern, so weeks are assembled from
/// `DATEPART(ISO_WEEK, ..)` and the year of that week's Thursday.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl TrendDateDialect for SqlServerDialect {
    fn expression(&self, column: &str, unit: TrendUnit, offset_seconds: i32) -> String {
        let shifted = match Shift::from_seconds(offset_seconds) {
            Shift::None => column.to_string(),
            Shift::Hours(h) => format!("DATEADD(hour, {h}, {column})"),
            Shift::Minutes(m) => format!("DATEADD(minute, {m}, {column})"),
        };
        let format = match unit {
            TrendUnit::Month => "yyyy-MM",
            TrendUnit::Day => "yyyy-MM-dd",
            TrendUnit::Hour => "yyyy-MM-dd HH:00",
            TrendUnit::Minute => "yyyy-MM-dd HH:mm:00",
            TrendUnit::Week => {
                return format!(
                    "CONCAT(YEAR(DATEADD(day, 26 - DATEPART(ISO_WEEK, {shifted}), {shifted})), '-', \
                     RIGHT('0' + CAST(DATEPART(ISO_WEEK, {shifted}) AS VARCHAR(2)), 2))"
                );
            }
        };
        format!("FORMAT({shifted}, '{format}')")
    }
}
