//! Dynamically typed attribute values.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::decimal::Decimal;

/// Display format for time values.
pub const TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Date format used for text and JSON output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value stored in, or read from, a tableless record.
///
/// Raw input may be any variant; a read always returns the variant that
/// matches the attribute's declared type (see [`crate::types::cast`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value. Also the fallback for unparseable temporal input.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    /// A point in time, normalized to UTC.
    Time(DateTime<Utc>),
    /// A point in time that keeps its original offset.
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    /// Variant name, for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub const fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub const fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(t) => Some(*t),
            _ => None,
        }
    }

    /// Canonical literal form, as shown by record display.
    ///
    /// Text is quoted and escaped, times use [`TIME_DISPLAY_FORMAT`].
    pub fn inspect(&self) -> String {
        match self {
            Value::Null => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_literal(*f),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => format!("{:?}", s),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Time(t) => t.format(TIME_DISPLAY_FORMAT).to_string(),
            Value::DateTime(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }

    /// Structured (JSON) form used by the column codecs.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => JsonValue::from(*f),
            Value::Decimal(d) => JsonValue::String(d.to_string()),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
            Value::Time(t) => JsonValue::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::DateTime(t) => {
                JsonValue::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
        }
    }

    /// Raw value from its structured form.
    ///
    /// The result is uncast: temporal and decimal values arrive as text and
    /// take their declared type when they pass through the caster.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or(0.0))),
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Float literal that always shows a fractional part (`1234.0`, not `1234`).
pub(crate) fn float_literal(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(|json| Value::from_json(&json))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&JsonValue> for Value {
    fn from(v: &JsonValue) -> Self {
        Value::from_json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inspect_literals() {
        assert_eq!(Value::Text("111".into()).inspect(), "\"111\"");
        assert_eq!(Value::Text(String::new()).inspect(), "\"\"");
        assert_eq!(Value::Int(5).inspect(), "5");
        assert_eq!(Value::Float(1234.0).inspect(), "1234.0");
        assert_eq!(Value::Float(0.25).inspect(), "0.25");
        assert_eq!(Value::Null.inspect(), "nil");
        assert_eq!(Value::Bool(true).inspect(), "true");
    }

    #[test]
    fn test_inspect_time_format() {
        let t = Utc.with_ymd_and_hms(2011, 1, 2, 15, 23, 0).unwrap();
        assert_eq!(Value::Time(t).inspect(), "2011-01-02 15:23:00 UTC");
    }

    #[test]
    fn test_json_forms() {
        let t = Utc.with_ymd_and_hms(2011, 1, 2, 15, 23, 0).unwrap();
        assert_eq!(Value::Time(t).to_json(), JsonValue::from("2011-01-02T15:23:00Z"));
        let d = NaiveDate::from_ymd_opt(2011, 1, 2).unwrap();
        assert_eq!(Value::Date(d).to_json(), JsonValue::from("2011-01-02"));
        assert_eq!(
            Value::Decimal(Decimal::parse_lossy("1.50")).to_json(),
            JsonValue::from("1.5")
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(&serde_json::json!(4.5)), Value::Float(4.5));
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Null);
        assert_eq!(
            Value::from_json(&serde_json::json!([1, 2])),
            Value::Text("[1,2]".to_string())
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
