//! Typed field values.

#![allow(clippy::match_same_arms)]

use std::cmp::Ordering;
use std::fmt::{self, Display};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Serialize, Serializer};

use crate::culture::Culture;
use crate::error::{QueryError, Result};
use crate::record::Record;
use crate::schema::DataType;

/// Output layout for date/time values.
pub(crate) const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A typed field value.
///
/// Values appear in records, as normalized filter literals, as group keys
/// and as aggregate results.
///
/// Note: `Real` uses bit equality and a total order (NaN < -Inf < values <
/// Inf) so that values can key groups and sort deterministically. The two
/// zeros are one value: `-0.0 == 0.0` in equality, hashing and ordering.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Real(f64),
    /// Exact decimal.
    Decimal(Decimal),
    /// UTF-8 text.
    Text(String),
    /// Local date and time.
    DateTime(NaiveDateTime),
    /// Nested record.
    Record(Record),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => real_bits(*a) == real_bits(*b),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false, // Different types are not equal
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);

        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Real(v) => real_bits(*v).hash(state),
            // Decimal hashing is scale-insensitive, consistent with its Eq.
            Value::Decimal(v) => v.hash(state),
            Value::Text(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::Record(v) => v.hash(state),
        }
    }
}

/// Bit pattern of a real with `-0.0` folded into `+0.0`.
fn real_bits(v: f64) -> u64 {
    if v == 0.0 { 0 } else { v.to_bits() }
}

/// Total ordering for f64 values.
///
/// NaN < -Inf < negative values < zero < positive values < +Inf
fn total_cmp_f64(a: f64, b: f64) -> Ordering {
    let a_bits = real_bits(a);
    let b_bits = real_bits(b);
    let sign = 1u64 << 63;

    // Flip sign bit for negatives to get correct ordering
    let a_key = if a_bits & sign != 0 {
        !a_bits
    } else {
        a_bits ^ sign
    };

    let b_key = if b_bits & sign != 0 {
        !b_bits
    } else {
        b_bits ^ sign
    };

    a_key.cmp(&b_key)
}

impl Value {
    /// Returns the data type of this value.
    ///
    /// Returns `None` for `Null`, which has no concrete type.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Real(_) => Some(DataType::Real),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Text(_) => Some(DataType::Text),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::Record(r) => Some(DataType::Record(r.record_type().name.clone())),
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a bool, if it is `Boolean`.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an f64, if it is a `Real`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a `Decimal`, if it is a `Decimal`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a date/time, if it is a `DateTime`.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the nested record, if this is a `Record`.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Compares two values for ordering.
    ///
    /// Null is less than every non-null value. Values of different types
    /// return `None` (incomparable). Records are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => Some(total_cmp_f64(*a, *b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Converts this value to JSON.
    ///
    /// Decimals become JSON numbers (exact when they fit an integer), date
    /// times become ISO-8601 text, records become objects keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(v) => serde_json::Value::Number((*v).into()),
            Value::Real(v) => {
                serde_json::Number::from_f64(*v)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number) // NaN/Inf become null
            }
            Value::Decimal(d) => {
                decimal_to_number(*d).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => {
                serde_json::Value::String(dt.format(DATETIME_OUTPUT_FORMAT).to_string())
            }
            Value::Record(r) => r.to_json(),
        }
    }

    /// Parses a scalar value from JSON with an expected data type.
    ///
    /// Numbers and booleans may also arrive as text (`"42"`, `"true"`), which
    /// is how UI grids often post filter values. Decimals are always parsed
    /// from their textual form so no binary floating point is involved.
    /// Nested records are decoded by [`Schema::decode_record`](crate::Schema::decode_record).
    pub fn from_json(json: &serde_json::Value, data_type: &DataType, culture: &Culture) -> Result<Self> {
        let mismatch = || QueryError::TypeMismatch {
            expected: data_type.to_string(),
            actual: json.to_string(),
        };

        match (json, data_type) {
            (serde_json::Value::Null, _) => Ok(Value::Null),

            (serde_json::Value::Bool(b), DataType::Boolean) => Ok(Value::Boolean(*b)),
            (serde_json::Value::String(s), DataType::Boolean) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },

            (serde_json::Value::Number(n), DataType::Integer) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(i64::from_f64))
                .map(Value::Integer)
                .ok_or_else(mismatch),
            (serde_json::Value::String(s), DataType::Integer) => {
                s.trim().parse().map(Value::Integer).map_err(|_| mismatch())
            }

            (serde_json::Value::Number(n), DataType::Real) => {
                n.as_f64().map(Value::Real).ok_or_else(mismatch)
            }
            (serde_json::Value::String(s), DataType::Real) => {
                s.trim().parse().map(Value::Real).map_err(|_| mismatch())
            }

            (serde_json::Value::Number(n), DataType::Decimal) => culture
                .parse_decimal(&n.to_string())
                .map(Value::Decimal)
                .ok_or_else(mismatch),
            (serde_json::Value::String(s), DataType::Decimal) => culture
                .parse_decimal(s)
                .map(Value::Decimal)
                .ok_or_else(mismatch),

            (serde_json::Value::String(s), DataType::Text) => Ok(Value::Text(s.clone())),

            (serde_json::Value::String(s), DataType::DateTime) => culture
                .parse_datetime(s)
                .map(Value::DateTime)
                .ok_or_else(mismatch),

            _ => Err(mismatch()),
        }
    }
}

/// Converts a decimal to a JSON number, keeping integers exact.
fn decimal_to_number(d: Decimal) -> Option<serde_json::Number> {
    let normalized = d.normalize();
    if normalized.scale() == 0 {
        if let Some(i) = normalized.to_i64() {
            return Some(i.into());
        }
    }
    normalized
        .to_string()
        .parse::<serde_json::Number>()
        .ok()
        .or_else(|| normalized.to_f64().and_then(serde_json::Number::from_f64))
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Real(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Real(_) => serializer.serialize_none(),
            Value::Decimal(d) => match decimal_to_number(*d) {
                Some(n) => n.serialize(serializer),
                None => serializer.serialize_none(),
            },
            Value::Text(s) => serializer.serialize_str(s),
            Value::DateTime(dt) => {
                serializer.collect_str(&dt.format(DATETIME_OUTPUT_FORMAT))
            }
            Value::Record(r) => r.serialize(serializer),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{}", d.normalize()),
            Value::Text(s) => write!(f, "{s}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_OUTPUT_FORMAT)),
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Integer(-5)), Some(Ordering::Less));
        assert_eq!(Value::Integer(1).compare(&Value::Null), Some(Ordering::Greater));
        assert_eq!(Value::Integer(1).compare(&Value::Text("1".into())), None);
    }

    #[test]
    fn test_real_total_order() {
        assert_eq!(
            Value::Real(f64::NAN).compare(&Value::Real(f64::NEG_INFINITY)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Real(-1.5).compare(&Value::Real(-0.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Real(-0.0).compare(&Value::Real(f64::MIN_POSITIVE)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_signed_zero_is_one_value() {
        use std::collections::HashSet;

        let culture = Culture::invariant();
        let negative = Value::from_json(&json!(-0.0), &DataType::Real, &culture).unwrap();
        let positive = Value::from_json(&json!(0), &DataType::Real, &culture).unwrap();

        assert_eq!(negative, positive);
        assert_eq!(negative.compare(&positive), Some(Ordering::Equal));
        let set: HashSet<Value> = [negative, positive, Value::Real(-0.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_decimal_equality_ignores_scale() {
        let a = Value::Decimal(Decimal::new(300_000, 2));
        let b = Value::Decimal(Decimal::from(3000));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "3000");
    }

    #[test]
    fn test_from_json_decimal_uses_text() {
        let culture = Culture::invariant();
        let v = Value::from_json(&json!(69.2), &DataType::Decimal, &culture).unwrap();
        assert_eq!(v, Value::Decimal(Decimal::new(692, 1)));

        let v = Value::from_json(&json!("999.00"), &DataType::Decimal, &culture).unwrap();
        assert_eq!(v, Value::Decimal(Decimal::from(999)));
    }

    #[test]
    fn test_from_json_lenient_scalars() {
        let culture = Culture::invariant();
        assert_eq!(
            Value::from_json(&json!("42"), &DataType::Integer, &culture).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            Value::from_json(&json!(6.0), &DataType::Integer, &culture).unwrap(),
            Value::Integer(6)
        );
        assert_eq!(
            Value::from_json(&json!("TRUE"), &DataType::Boolean, &culture).unwrap(),
            Value::Boolean(true)
        );
        assert!(Value::from_json(&json!(6.5), &DataType::Integer, &culture).is_err());
        assert!(Value::from_json(&json!(12), &DataType::Text, &culture).is_err());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Decimal(Decimal::new(1485000, 2)).to_json(), json!(14850));
        assert_eq!(Value::Decimal(Decimal::new(29705, 1)).to_json(), json!(2970.5));
        assert_eq!(Value::Real(f64::NAN).to_json(), serde_json::Value::Null);

        let dt = Culture::invariant().parse_datetime("1986-10-09T08:30:00").unwrap();
        assert_eq!(Value::DateTime(dt).to_json(), json!("1986-10-09T08:30:00"));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let values = [
            Value::Null,
            Value::Boolean(true),
            Value::Integer(7),
            Value::Real(1.5),
            Value::Decimal(Decimal::new(2850, 0)),
            Value::Text("Monie".into()),
        ];
        for v in values {
            assert_eq!(serde_json::to_value(&v).unwrap(), v.to_json());
        }
    }
}
