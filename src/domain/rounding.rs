//! Rounding precision and mode for metric values.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How a midpoint is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 2.5 -> 3, -2.5 -> -3
    #[default]
    HalfUp,
    /// 2.5 -> 2, -2.5 -> -2
    HalfDown,
    /// 2.5 -> 2, 3.5 -> 4
    HalfEven,
    /// 2.5 -> 3, 3.5 -> 3
    HalfOdd,
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HalfUp => "half_up",
            Self::HalfDown => "half_down",
            Self::HalfEven => "half_even",
            Self::HalfOdd => "half_odd",
        })
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "half_up" => Ok(Self::HalfUp),
            "half_down" => Ok(Self::HalfDown),
            "half_even" => Ok(Self::HalfEven),
            "half_odd" => Ok(Self::HalfOdd),
            other => Err(format!("unknown rounding mode '{other}'")),
        }
    }
}

/// Number of decimal places plus midpoint mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rounding {
    pub precision: u32,
    pub mode: RoundingMode,
}

impl Rounding {
    #[must_use]
    pub const fn new(precision: u32, mode: RoundingMode) -> Self {
        Self { precision, mode }
    }

    /// Round `value`. Non-finite values and values outside the decimal range
    /// are returned unchanged.
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        let Some(decimal) = Decimal::from_f64(value) else {
            return value;
        };
        self.apply_decimal(decimal).to_f64().unwrap_or(value)
    }

    #[must_use]
    pub fn apply_decimal(&self, value: Decimal) -> Decimal {
        let strategy = match self.mode {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::HalfOdd => return round_half_odd(value, self.precision),
        };
        value.round_dp_with_strategy(self.precision, strategy)
    }
}

fn round_half_odd(value: Decimal, precision: u32) -> Decimal {
    let Some(factor) = 10u64.checked_pow(precision).map(Decimal::from) else {
        return value;
    };
    let Some(scaled) = value.checked_mul(factor) else {
        return value;
    };
    let truncated = scaled.trunc();
    let remainder = (scaled - truncated).abs();

    let rounded = if remainder == Decimal::new(5, 1) {
        if (truncated % Decimal::TWO).is_zero() {
            let away = if scaled.is_sign_negative() {
                -Decimal::ONE
            } else {
                Decimal::ONE
            };
            truncated + away
        } else {
            truncated
        }
    } else {
        scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    };
    (rounded / factor).normalize()
}
