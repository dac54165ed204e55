//! Fixed-point decimal for serving quantities
//!
//! Stored as a count of hundredths so that `decimal(18,2)` values survive
//! a round trip through the store without floating point drift.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::limits::{DECIMAL_PRECISION, DECIMAL_SCALE};
use crate::errors::RecipeError;

const SCALE_FACTOR: i64 = 10_i64.pow(DECIMAL_SCALE);
/// Largest absolute value representable with the column's precision
const MAX_SCALED: i64 = 10_i64.pow(DECIMAL_PRECISION) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal {
    hundredths: i64,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { hundredths: 0 };

    /// Build from a whole number
    pub fn from_whole(value: i32) -> Self {
        Self {
            hundredths: i64::from(value) * SCALE_FACTOR,
        }
    }

    /// Build from a count of hundredths, checking the column precision
    pub fn from_hundredths(hundredths: i64) -> Result<Self, RecipeError> {
        if hundredths.unsigned_abs() > MAX_SCALED.unsigned_abs() {
            return Err(RecipeError::InvalidDecimal {
                input: hundredths.to_string(),
                reason: format!("exceeds {} significant digits", DECIMAL_PRECISION),
            });
        }
        Ok(Self { hundredths })
    }

    pub fn hundredths(&self) -> i64 {
        self.hundredths
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        let factor = SCALE_FACTOR as u64;
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / factor,
            abs % factor,
            width = DECIMAL_SCALE as usize
        )
    }
}

impl FromStr for Decimal {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RecipeError::InvalidDecimal {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("not a decimal number"));
        }
        if fraction.len() > DECIMAL_SCALE as usize {
            return Err(invalid("more than two digits after the decimal point"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| invalid("whole part out of range"))?
        };
        let mut fraction_digits = fraction.to_string();
        while fraction_digits.len() < DECIMAL_SCALE as usize {
            fraction_digits.push('0');
        }
        let fraction_value: i64 = fraction_digits
            .parse()
            .map_err(|_| invalid("fraction out of range"))?;

        let magnitude = whole_value
            .checked_mul(SCALE_FACTOR)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(|| invalid("value out of range"))?;

        Decimal::from_hundredths(if negative { -magnitude } else { magnitude })
            .map_err(|_| invalid("exceeds column precision"))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl<'de> Visitor<'de> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a decimal number or a string holding one")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Decimal, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
                value
                    .checked_mul(SCALE_FACTOR)
                    .ok_or_else(|| E::custom("value out of range"))
                    .and_then(|h| Decimal::from_hundredths(h).map_err(E::custom))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
                let signed = i64::try_from(value).map_err(|_| E::custom("value out of range"))?;
                self.visit_i64(signed)
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
                self.visit_str(&value.to_string())
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}
