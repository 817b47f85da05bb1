//! Arbitrary-precision decimal numbers kept in canonical text form.
//!
//! A `Decimal` never goes through binary floating point: it stores the
//! normalized digit string (`-12.5`, `0.001`, `1234`), so equality is plain
//! string equality and round trips through text are exact.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::pattern::leading_match;

/// Leading decimal literal: sign, digits, optional fraction and exponent.
const DECIMAL_PREFIX: &str = r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?";

/// Exponents beyond this magnitude are ignored rather than expanded.
const MAX_EXPONENT: i64 = 1024;

/// A canonical arbitrary-precision decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    repr: String,
}

impl Decimal {
    /// The zero decimal.
    pub fn zero() -> Self {
        Self {
            repr: "0".to_string(),
        }
    }

    /// Parse the leading decimal literal of `input`.
    ///
    /// Trailing garbage is ignored (`"12.5kg"` parses as `12.5`). Returns
    /// `None` when `input` does not start with a number.
    pub fn parse_prefix(input: &str) -> Option<Self> {
        let literal = leading_match(input, DECIMAL_PREFIX)?;
        Some(Self::normalize(literal.trim()))
    }

    /// Best-effort parse: the leading literal, or zero.
    pub fn parse_lossy(input: &str) -> Self {
        Self::parse_prefix(input).unwrap_or_else(Self::zero)
    }

    /// Exact conversion from an integer.
    pub fn from_i64(value: i64) -> Self {
        Self {
            repr: value.to_string(),
        }
    }

    /// Conversion from a float via its shortest round-trip text.
    ///
    /// Non-finite floats become zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::zero();
        }
        Self::parse_lossy(&format!("{:?}", value))
    }

    /// True when the value is zero.
    pub fn is_zero(&self) -> bool {
        self.repr == "0"
    }

    /// True when the value is negative.
    pub fn is_negative(&self) -> bool {
        self.repr.starts_with('-')
    }

    /// The canonical text.
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        self.repr.parse().unwrap_or(0.0)
    }

    /// The integer part, saturating at the `i64` bounds.
    pub fn trunc_i64(&self) -> i64 {
        let integral = self.repr.split('.').next().unwrap_or("0");
        integral.parse().unwrap_or_else(|_| {
            if self.is_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    }

    fn normalize(literal: &str) -> Self {
        let (negative, unsigned) = match literal.as_bytes().first() {
            Some(b'-') => (true, &literal[1..]),
            Some(b'+') => (false, &literal[1..]),
            _ => (false, literal),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => {
                let exp = unsigned[pos + 1..].parse::<i64>().unwrap_or(0);
                let exp = if exp.unsigned_abs() > MAX_EXPONENT.unsigned_abs() { 0 } else { exp };
                (&unsigned[..pos], exp)
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits: String = int_part.chars().chain(frac_part.chars()).collect();
        let point = int_part.len() as i64 + exponent;

        let (whole, fraction) = if point <= 0 {
            let zeros = "0".repeat(point.unsigned_abs() as usize);
            (String::new(), format!("{}{}", zeros, digits))
        } else if point as usize >= digits.len() {
            let zeros = "0".repeat(point as usize - digits.len());
            (format!("{}{}", digits, zeros), String::new())
        } else {
            let (w, f) = digits.split_at(point as usize);
            (w.to_string(), f.to_string())
        };

        let whole = whole.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');

        let mut repr = String::with_capacity(whole.len() + fraction.len() + 2);
        if whole.is_empty() {
            repr.push('0');
        } else {
            repr.push_str(whole);
        }
        if !fraction.is_empty() {
            repr.push('.');
            repr.push_str(fraction);
        }
        if negative && repr != "0" {
            repr.insert(0, '-');
        }
        Self { repr }
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.repr)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Decimal::parse_prefix(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {text}")))
    }
}
