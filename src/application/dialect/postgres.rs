use super::{Shift, TrendDateDialect};
use crate::domain::TrendUnit;

/// PostgreSQL `to_char`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl TrendDateDialect for PostgresDialect {
    fn expression(&self, column: &str, unit: TrendUnit, offset_seconds: i32) -> String {
        let format = match unit {
            TrendUnit::Month => "YYYY-MM",
            TrendUnit::Week => "IYYY-IW",
            TrendUnit::Day => "YYYY-MM-DD",
            TrendUnit::Hour => "YYYY-MM-DD HH24:00",
            TrendUnit::Minute => "YYYY-MM-DD HH24:MI:00",
        };
        let shifted = match Shift::from_seconds(offset_seconds) {
            Shift::None => column.to_string(),
            Shift::Hours(h) if h < 0 => format!("{column} - interval '{} hour'", -h),
            Shift::Hours(h) => format!("{column} + interval '{h} hour'"),
            Shift::Minutes(m) if m < 0 => format!("{column} - interval '{} minute'", -m),
            Shift::Minutes(m) => format!("{column} + interval '{m} minute'"),
        };
        format!("to_char({shifted}, '{format}')")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_units() {
        assert_eq!(
            PostgresDialect.expression("created_at", TrendUnit::Week, 0),
            "to_char(created_at, 'IYYY-IW')"
        );
        assert_eq!(
            PostgresDialect.expression("created_at", TrendUnit::Hour, -4 * 3600),
            "to_char(created_at - interval '4 hour', 'YYYY-MM-DD HH24:00')"
        );
        assert_eq!(
            PostgresDialect.expression("\"createdAt\"", TrendUnit::Day, 9 * 3600),
            "to_char(\"createdAt\" + interval '9 hour', 'YYYY-MM-DD')"
        );
    }
}
