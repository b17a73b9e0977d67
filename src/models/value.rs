//! Typed column and parameter values.
//!
//! [`Value`] is what flows between records, parameter sets, and the driver.
//! [`ToValue`] and [`FromValue`] convert between record field types and values.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A database value.
///
/// `Bool`, `SmallInt`, `Float` and `Time` can be read from result rows but are
/// refused as statement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    /// CHAR / VARCHAR
    Text(String),
    /// Character large object
    Clob(String),
    Int(i32),
    BigInt(i64),
    Double(f64),
    /// Exact numeric, kept in textual form
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// VARBINARY (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    /// Binary large object (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Blob(Vec<u8>),
    Bool(bool),
    SmallInt(i16),
    Float(f32),
    Time(NaiveTime),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the SQL type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Text(_) => "VARCHAR",
            Self::Clob(_) => "CLOB",
            Self::Int(_) => "INTEGER",
            Self::BigInt(_) => "BIGINT",
            Self::Double(_) => "DOUBLE",
            Self::Decimal(_) => "DECIMAL",
            Self::Date(_) => "DATE",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Bytes(_) => "VARBINARY",
            Self::Blob(_) => "BLOB",
            Self::Bool(_) => "BOOLEAN",
            Self::SmallInt(_) => "SMALLINT",
            Self::Float(_) => "REAL",
            Self::Time(_) => "TIME",
        }
    }

    /// Check whether the executor accepts this value as a statement parameter.
    pub fn is_bindable(&self) -> bool {
        !matches!(
            self,
            Self::Bool(_) | Self::SmallInt(_) | Self::Float(_) | Self::Time(_)
        )
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Exact decimal number in canonical textual form, e.g. `-12.50`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal(String);

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Decimal {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let valid = !(int_part.is_empty() && frac_part.is_empty())
            && int_part.bytes().all(|b| b.is_ascii_digit())
            && frac_part.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(ValueError::InvalidDecimal(s.to_string()));
        }
        Ok(Self(s.trim_start_matches('+').to_string()))
    }
}

impl TryFrom<String> for Decimal {
    type Error = ValueError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Decimal> for String {
    fn from(d: Decimal) -> Self {
        d.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("'{0}' is not a decimal number")]
    InvalidDecimal(String),
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

/// Conversion of a record field into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion of a [`Value`] into a record field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_to_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }
            }
        )+
    };
}

impl_to_value! {
    String => Text,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    Decimal => Decimal,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    Vec<u8> => Bytes,
    bool => Bool,
    i16 => SmallInt,
    f32 => Float,
    NaiveTime => Time,
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) | Value::Clob(s) => Ok(s),
            other => Err(mismatch("VARCHAR", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(v) => Ok(v),
            Value::SmallInt(v) => Ok(i32::from(v)),
            Value::BigInt(v) => i32::try_from(v).map_err(|_| ValueError::OutOfRange {
                value: v.to_string(),
                target: "INTEGER",
            }),
            other => Err(mismatch("INTEGER", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::BigInt(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            Value::SmallInt(v) => Ok(i64::from(v)),
            other => Err(mismatch("BIGINT", &other)),
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let out_of_range = |v: i64| ValueError::OutOfRange {
            value: v.to_string(),
            target: "SMALLINT",
        };
        match value {
            Value::SmallInt(v) => Ok(v),
            Value::Int(v) => i16::try_from(v).map_err(|_| out_of_range(i64::from(v))),
            Value::BigInt(v) => i16::try_from(v).map_err(|_| out_of_range(v)),
            other => Err(mismatch("SMALLINT", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            other => Err(mismatch("DOUBLE", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(mismatch("REAL", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::BigInt(v) => Ok(v != 0),
            other => Err(mismatch("BOOLEAN", &other)),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Decimal(v) => Ok(v),
            other => Err(mismatch("DECIMAL", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Date(v) => Ok(v),
            other => Err(mismatch("DATE", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => Err(mismatch("TIMESTAMP", &other)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Time(v) => Ok(v),
            other => Err(mismatch("TIME", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) | Value::Blob(v) => Ok(v),
            other => Err(mismatch("VARBINARY", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse() {
        assert_eq!("12.50".parse::<Decimal>().unwrap().as_str(), "12.50");
        assert_eq!("+3".parse::<Decimal>().unwrap().as_str(), "3");
        assert_eq!("-.5".parse::<Decimal>().unwrap().as_str(), "-.5");
        assert!("1e5".parse::<Decimal>().is_err());
        assert!(".".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_option_round_trip() {
        let none: Option<i32> = None;
        assert_eq!(none.to_value(), Value::Null);
        assert_eq!(Option::<i32>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i32>::from_value(Value::Int(7)), Ok(Some(7)));
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(i32::from_value(Value::BigInt(42)), Ok(42));
        assert!(matches!(
            i32::from_value(Value::BigInt(i64::MAX)),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_large_objects_convert_to_plain_types() {
        assert_eq!(
            String::from_value(Value::Clob("long text".into())),
            Ok("long text".to_string())
        );
        assert_eq!(Vec::<u8>::from_value(Value::Blob(vec![1, 2])), Ok(vec![1, 2]));
    }

    #[test]
    fn test_type_mismatch_reports_both_types() {
        let err = NaiveDate::from_value(Value::Text("2024-01-01".into())).unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: "DATE",
                found: "VARCHAR"
            }
        );
    }

    #[test]
    fn test_bindable_types() {
        assert!(Value::Null.is_bindable());
        assert!(Value::Decimal("1.0".parse().unwrap()).is_bindable());
        assert!(!Value::Bool(true).is_bindable());
        assert!(!Value::SmallInt(1).is_bindable());
        assert!(!Value::Float(1.0).is_bindable());
        assert!(!Value::Time(NaiveTime::MIN).is_bindable());
    }

    #[test]
    fn test_json_encodes_bytes_as_base64() {
        let json = serde_json::to_value(Value::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(json, serde_json::json!("aGk="));
        let json = serde_json::to_value(Value::Null).unwrap();
        assert!(json.is_null());
    }
}
