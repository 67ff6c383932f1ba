use super::{Shift, TrendDateDialect};
use crate::domain::TrendUnit;

/// MySQL and MariaDB `date_format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl TrendDateDialect for MySqlDialect {
    fn expression(&self, column: &str, unit: TrendUnit, offset_seconds: i32) -> String {
        let format = match unit {
            TrendUnit::Month => "%Y-%m",
            TrendUnit::Week => "%x-%v",
            TrendUnit::Day => "%Y-%m-%d",
            TrendUnit::Hour => "%Y-%m-%d %H:00",
            TrendUnit::Minute => "%Y-%m-%d %H:%i:00",
        };
        let shifted = match Shift::from_seconds(offset_seconds) {
            Shift::None => column.to_string(),
            Shift::Hours(h) if h < 0 => format!("{column} - INTERVAL {} HOUR", -h),
            Shift::Hours(h) => format!("{column} + INTERVAL {h} HOUR"),
            Shift::Minutes(m) if m < 0 => format!("{column} - INTERVAL {} MINUTE", -m),
            Shift::Minutes(m) => format!("{column} + INTERVAL {m} MINUTE"),
        };
        format!("date_format({shifted}, '{format}')")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_week_with_iso_year() {
        assert_eq!(
            MySqlDialect.expression("created_at", TrendUnit::Week, 0),
            "date_format(created_at, '%x-%v')"
        );
    }

    #[test]
    fn shifts_by_hours_or_minutes() {
        assert_eq!(
            MySqlDialect.expression("orders.created_at", TrendUnit::Month, 2 * 3600),
            "date_format(orders.created_at + INTERVAL 2 HOUR, '%Y-%m')"
        );
        assert_eq!(
            MySqlDialect.expression("created_at", TrendUnit::Minute, -(3 * 3600 + 1800)),
            "date_format(created_at - INTERVAL 210 MINUTE, '%Y-%m-%d %H:%i:00')"
        );
    }
}
