//! Declared attribute types and the Type Caster.
//!
//! [`cast`] is total: it maps any raw [`Value`] onto the declared type and
//! never fails. Input that cannot be coerced degrades to the type's empty
//! value:
//!
//! | type       | empty value                          |
//! |------------|--------------------------------------|
//! | `String`   | `""`                                 |
//! | `Integer`  | `0`                                  |
//! | `Float`    | `0.0` (also for overflow and NaN)    |
//! | `Decimal`  | `0`                                  |
//! | `Time`     | `Null`                               |
//! | `Date`     | `Null`                               |
//! | `DateTime` | `Null`                               |
//! | `Boolean`  | n/a, every input is true or false    |
//!
//! Two boolean readings exist. A `Boolean` cast reads loosely typed input:
//! zero, empty text and the words in `FALSY_TEXT` are false. A predicate
//! read (`name?`) uses [`truthy`], where only `Null` and `false` are false.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::pattern::leading_match;
use crate::value::{DATE_FORMAT, Value, float_literal};

const INTEGER_PREFIX: &str = r"^\s*[+-]?\d+";
const FLOAT_PREFIX: &str = r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?";

/// Offset-carrying formats, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without an offset; they are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[DATE_FORMAT, "%Y/%m/%d", "%d %B %Y", "%B %d, %Y", "%b %d %Y"];

/// Text that reads as `false`.
const FALSY_TEXT: &[&str] = &["", "false", "f", "0", "no", "n", "off"];

/// The semantic type declared for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AttrType {
    /// Text; the type of attributes declared without one.
    #[default]
    String = 0,
    Integer = 1,
    Float = 2,
    Decimal = 3,
    Time = 4,
    Date = 5,
    DateTime = 6,
    Boolean = 7,
}

impl AttrType {
    /// Every declarable type.
    pub const ALL: [AttrType; 8] = [
        AttrType::String,
        AttrType::Integer,
        AttrType::Float,
        AttrType::Decimal,
        AttrType::Time,
        AttrType::Date,
        AttrType::DateTime,
        AttrType::Boolean,
    ];

    /// Declaration name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Integer => "integer",
            AttrType::Float => "float",
            AttrType::Decimal => "decimal",
            AttrType::Time => "time",
            AttrType::Date => "date",
            AttrType::DateTime => "datetime",
            AttrType::Boolean => "boolean",
        }
    }

    /// Parse a declaration name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(AttrType::String),
            "integer" | "int" => Some(AttrType::Integer),
            "float" => Some(AttrType::Float),
            "decimal" => Some(AttrType::Decimal),
            "time" => Some(AttrType::Time),
            "date" => Some(AttrType::Date),
            "datetime" | "date_time" => Some(AttrType::DateTime),
            "boolean" | "bool" => Some(AttrType::Boolean),
            _ => None,
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_u8(tag: u8) -> Self {
        match tag {
            1 => AttrType::Integer,
            2 => AttrType::Float,
            3 => AttrType::Decimal,
            4 => AttrType::Time,
            5 => AttrType::Date,
            6 => AttrType::DateTime,
            7 => AttrType::Boolean,
            _ => AttrType::String,
        }
    }

    /// Cast `value` to this type. See [`cast`].
    pub fn cast(self, value: &Value) -> Value {
        cast(self, value)
    }

    /// True when `value` already has the variant this type casts to.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (AttrType::String, Value::Text(_))
                | (AttrType::Integer, Value::Int(_))
                | (AttrType::Float, Value::Float(_))
                | (AttrType::Decimal, Value::Decimal(_))
                | (AttrType::Time, Value::Time(_) | Value::Null)
                | (AttrType::Date, Value::Date(_) | Value::Null)
                | (AttrType::DateTime, Value::DateTime(_) | Value::Null)
                | (AttrType::Boolean, Value::Bool(_))
        )
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw value onto the declared type. Never fails.
pub fn cast(ty: AttrType, value: &Value) -> Value {
    let cast = match ty {
        AttrType::String => Value::Text(to_text(value)),
        AttrType::Integer => Value::Int(to_integer(value)),
        AttrType::Float => {
            let f = to_float(value);
            Value::Float(if f.is_finite() { f } else { 0.0 })
        }
        AttrType::Decimal => Value::Decimal(to_decimal(value)),
        AttrType::Time => to_time(value).map_or(Value::Null, Value::Time),
        AttrType::Date => to_date(value).map_or(Value::Null, Value::Date),
        AttrType::DateTime => to_datetime(value).map_or(Value::Null, Value::DateTime),
        AttrType::Boolean => Value::Bool(to_boolean(value)),
    };
    if cast.is_null() && !value.is_null() {
        tracing::trace!(
            declared = ty.name(),
            input = value.type_name(),
            "Uncoercible input cast to null"
        );
    }
    cast
}

/// Truthiness of predicate reads: only `Null` and `false` are false.
pub fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// The `Boolean` cast of loosely typed input.
fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Decimal(d) => !d.is_zero(),
        Value::Text(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            !FALSY_TEXT.contains(&lowered.as_str())
        }
        Value::Date(_) | Value::Time(_) | Value::DateTime(_) => true,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        Value::Time(t) => t.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        Value::DateTime(t) => t.to_rfc3339(),
    }
}

fn to_integer(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        // `as` saturates and maps NaN to zero.
        Value::Float(f) => f.trunc() as i64,
        Value::Decimal(d) => d.trunc_i64(),
        Value::Text(s) => match leading_match(s, INTEGER_PREFIX) {
            Some(digits) => {
                let digits = digits.trim();
                digits
                    .parse::<i64>()
                    .unwrap_or_else(|_| if digits.starts_with('-') { i64::MIN } else { i64::MAX })
            }
            None => 0,
        },
        Value::Time(t) => t.timestamp(),
        Value::DateTime(t) => t.timestamp(),
        Value::Null | Value::Bool(_) | Value::Date(_) => 0,
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Decimal(d) => d.to_f64(),
        Value::Text(s) => leading_match(s, FLOAT_PREFIX)
            .and_then(|literal| literal.trim().parse::<f64>().ok())
            .unwrap_or(0.0),
        Value::Time(t) => unix_seconds(t.timestamp(), t.timestamp_subsec_nanos()),
        Value::DateTime(t) => unix_seconds(t.timestamp(), t.timestamp_subsec_nanos()),
        Value::Null | Value::Bool(_) | Value::Date(_) => 0.0,
    }
}

fn to_decimal(value: &Value) -> Decimal {
    match value {
        Value::Decimal(d) => d.clone(),
        Value::Int(i) => Decimal::from_i64(*i),
        Value::Float(f) => Decimal::from_f64(*f),
        other => Decimal::parse_lossy(&to_text(other)),
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::DateTime(t) => Some(*t),
        Value::Time(t) => Some(t.fixed_offset()),
        Value::Date(d) => Some(midnight_utc(*d).fixed_offset()),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0).map(|t| t.fixed_offset()),
        Value::Float(f) => from_unix_float(*f).map(|t| t.fixed_offset()),
        Value::Decimal(d) => from_unix_float(d.to_f64()).map(|t| t.fixed_offset()),
        Value::Text(s) => parse_datetime(s),
        Value::Null | Value::Bool(_) => None,
    }
}

fn to_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Time(t) => Some(*t),
        other => to_datetime(other).map(|t| t.with_timezone(&Utc)),
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Time(t) => Some(t.date_naive()),
        Value::DateTime(t) => Some(t.date_naive()),
        Value::Text(s) => parse_date(s),
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Decimal(_) => None,
    }
}

fn unix_seconds(secs: i64, nanos: u32) -> f64 {
    secs as f64 + f64::from(nanos) / 1e9
}

fn from_unix_float(f: f64) -> Option<DateTime<Utc>> {
    if !f.is_finite() {
        return None;
    }
    let secs = f.floor();
    let nanos = ((f - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Best-effort calendar/time parse of text.
fn parse_datetime(input: &str) -> Option<DateTime<FixedOffset>> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t);
    }
    if let Some(t) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    {
        return Some(t);
    }

    let naive = text
        .strip_suffix("UTC")
        .or_else(|| text.strip_suffix('Z'))
        .map_or(text, str::trim_end);
    if let Some(t) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&t).fixed_offset());
    }

    parse_date(text).map(|d| midnight_utc(d).fixed_offset())
}

/// Best-effort date-only parse of text. Time-of-day parts are dropped.
fn parse_date(input: &str) -> Option<NaiveDate> {
    let text = input.trim();
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Some(d);
    }
    // A leading ISO date followed by a time of day.
    let head = text.get(..10)?;
    let rest = &text[10..];
    if rest.starts_with([' ', 'T']) {
        return NaiveDate::parse_from_str(head, DATE_FORMAT).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_string_cast() {
        assert_eq!(cast(AttrType::String, &Value::Null), text(""));
        assert_eq!(cast(AttrType::String, &Value::Int(111)), text("111"));
        assert_eq!(cast(AttrType::String, &Value::Float(1234.0)), text("1234.0"));
        assert_eq!(cast(AttrType::String, &Value::Bool(true)), text("true"));
        assert_eq!(cast(AttrType::String, &text("test")), text("test"));
    }

    #[test]
    fn test_integer_cast() {
        assert_eq!(cast(AttrType::Integer, &text("12")), Value::Int(12));
        assert_eq!(cast(AttrType::Integer, &text("1234.12")), Value::Int(1234));
        assert_eq!(cast(AttrType::Integer, &text(" -7 apples")), Value::Int(-7));
        assert_eq!(cast(AttrType::Integer, &text("test")), Value::Int(0));
        assert_eq!(cast(AttrType::Integer, &Value::Float(-3.9)), Value::Int(-3));
        assert_eq!(cast(AttrType::Integer, &Value::Float(f64::NAN)), Value::Int(0));
        assert_eq!(cast(AttrType::Integer, &Value::Bool(true)), Value::Int(0));
        assert_eq!(cast(AttrType::Integer, &Value::Null), Value::Int(0));
        assert_eq!(
            cast(AttrType::Integer, &text("99999999999999999999")),
            Value::Int(i64::MAX)
        );
    }

    #[test]
    fn test_float_cast() {
        assert_eq!(cast(AttrType::Float, &text("1234.12")), Value::Float(1234.12));
        assert_eq!(cast(AttrType::Float, &Value::Int(3)), Value::Float(3.0));
        assert_eq!(cast(AttrType::Float, &text("nope")), Value::Float(0.0));
        assert_eq!(cast(AttrType::Float, &text("2.5e2x")), Value::Float(250.0));
    }

    #[test]
    fn test_decimal_cast() {
        assert_eq!(
            cast(AttrType::Decimal, &text("1234.12")),
            Value::Decimal(Decimal::parse_lossy("1234.12"))
        );
        assert_eq!(
            cast(AttrType::Decimal, &Value::Int(1234)),
            Value::Decimal(Decimal::from_i64(1234))
        );
        assert_eq!(
            cast(AttrType::Decimal, &text("test")),
            Value::Decimal(Decimal::zero())
        );
        assert_eq!(
            cast(AttrType::Decimal, &Value::Bool(true)),
            Value::Decimal(Decimal::zero())
        );
    }

    #[test]
    fn test_time_cast() {
        let expected = Utc.with_ymd_and_hms(2011, 1, 2, 15, 23, 0).unwrap();
        assert_eq!(
            cast(AttrType::Time, &text("2011-01-02 15:23")),
            Value::Time(expected)
        );
        assert_eq!(
            cast(AttrType::Time, &text("2011-01-02T15:23:00Z")),
            Value::Time(expected)
        );
        assert_eq!(
            cast(AttrType::Time, &text("2011-01-02 17:23:00 +0200")),
            Value::Time(expected)
        );
        assert_eq!(
            cast(AttrType::Time, &text("2011-01-02 15:23:00 UTC")),
            Value::Time(expected)
        );
        assert_eq!(cast(AttrType::Time, &Value::Time(expected)), Value::Time(expected));
    }

    #[test]
    fn test_time_unparseable_is_null() {
        assert_eq!(cast(AttrType::Time, &text("test")), Value::Null);
        assert_eq!(cast(AttrType::Time, &Value::Bool(true)), Value::Null);
        assert_eq!(cast(AttrType::Time, &Value::Null), Value::Null);
        assert_eq!(cast(AttrType::DateTime, &text("")), Value::Null);
        assert_eq!(cast(AttrType::Date, &Value::Int(1234)), Value::Null);
    }

    #[test]
    fn test_time_from_unix_seconds() {
        let expected = Utc.with_ymd_and_hms(1970, 1, 1, 0, 20, 34).unwrap();
        assert_eq!(cast(AttrType::Time, &Value::Int(1234)), Value::Time(expected));
    }

    #[test]
    fn test_datetime_keeps_offset() {
        let cast = cast(AttrType::DateTime, &text("2011-01-02T15:23:00+02:00"));
        let t = cast.as_datetime().unwrap();
        assert_eq!(t.offset().local_minus_utc(), 7200);
        assert_eq!(t.to_rfc3339(), "2011-01-02T15:23:00+02:00");
    }

    #[test]
    fn test_date_cast() {
        let expected = NaiveDate::from_ymd_opt(2011, 1, 2).unwrap();
        assert_eq!(cast(AttrType::Date, &text("2011-01-02")), Value::Date(expected));
        assert_eq!(
            cast(AttrType::Date, &text("2011-01-02 15:23")),
            Value::Date(expected)
        );
        assert_eq!(cast(AttrType::Date, &text("1234.12")), Value::Null);
        assert_eq!(cast(AttrType::Date, &text("test")), Value::Null);
    }

    #[test]
    fn test_boolean_cast() {
        for truthy_input in [text("test"), Value::Int(1234), Value::Bool(true), text("yes")] {
            assert_eq!(cast(AttrType::Boolean, &truthy_input), Value::Bool(true));
        }
        for falsy_input in [text(""), text("false"), text(" OFF "), Value::Int(0), Value::Null] {
            assert_eq!(cast(AttrType::Boolean, &falsy_input), Value::Bool(false));
        }
    }

    #[test]
    fn test_predicate_truthiness() {
        for falsy in [Value::Null, Value::Bool(false)] {
            assert!(!truthy(&falsy));
        }
        for value in [text(""), text("0"), text("false"), Value::Int(0), Value::Float(0.0)] {
            assert!(truthy(&value), "{value:?}");
        }
    }

    #[test]
    fn test_float_overflow_falls_back_to_zero() {
        assert_eq!(cast(AttrType::Float, &text("1e400")), Value::Float(0.0));
        assert_eq!(cast(AttrType::Float, &text("-1e400")), Value::Float(0.0));
        assert_eq!(cast(AttrType::Float, &Value::Float(f64::NAN)), Value::Float(0.0));
        assert_eq!(
            cast(AttrType::Float, &Value::Decimal(Decimal::parse_lossy("1e400"))),
            Value::Float(0.0)
        );
        assert_eq!(cast(AttrType::Float, &text("1e300")), Value::Float(1e300));
    }

    #[test]
    fn test_huge_decimal_exponent_never_panics() {
        assert_eq!(
            cast(AttrType::Decimal, &text("1e-9223372036854775808")),
            Value::Decimal(Decimal::from_i64(1))
        );
        assert_eq!(
            cast(AttrType::Decimal, &text("1e9223372036854775807")),
            Value::Decimal(Decimal::from_i64(1))
        );
    }

    #[test]
    fn test_cast_is_idempotent_and_accepted() {
        let inputs = [
            text("test"),
            Value::Int(1234),
            Value::Bool(true),
            text("1234.12"),
            text("2011-01-02 15:23"),
            Value::Null,
        ];
        for ty in AttrType::ALL {
            for input in &inputs {
                let once = cast(ty, input);
                assert!(ty.accepts(&once), "{ty} produced {once:?}");
                assert_eq!(cast(ty, &once), once, "{ty} not idempotent for {input:?}");
            }
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        for ty in AttrType::ALL {
            assert_eq!(AttrType::from_name(ty.name()), Some(ty));
            assert_eq!(AttrType::from_u8(ty.to_u8()), ty);
        }
        assert_eq!(AttrType::from_name("date_time"), Some(AttrType::DateTime));
        assert_eq!(AttrType::from_name("blob"), None);
    }
}
