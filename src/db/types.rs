//! Database-agnostic type mappings.
//!
//! This module maps database column types onto [`Value`].
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction

use std::str::FromStr;

use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

use crate::db::macros::DatabaseType;
use crate::error::DriverError;
use crate::models::{Decimal, Value};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Text,
    LargeText,
    Binary,
    LargeBinary,
    Date,
    Timestamp,
    Time,
    Null,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "null" {
        return TypeCategory::Null;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite {
            return TypeCategory::Double;
        }
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Integer types
    if lower.contains("int") {
        // SQLite stores every integer as 64-bit; unsigned MySQL ints may exceed i32
        if db == DatabaseType::SQLite || lower.contains("bigint") || lower.contains("unsigned") {
            return TypeCategory::BigInt;
        }
        if lower.contains("smallint") || lower.contains("tinyint") {
            return TypeCategory::SmallInt;
        }
        return TypeCategory::Integer;
    }

    if lower.contains("double") || (lower == "real" && db == DatabaseType::SQLite) {
        return TypeCategory::Double;
    }
    if lower.contains("float") || lower == "real" {
        return TypeCategory::Float;
    }

    // Date and time - datetime/timestamp before their date/time substrings
    if lower.contains("datetime") || lower.contains("timestamp") {
        return TypeCategory::Timestamp;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" {
        return TypeCategory::Time;
    }

    // Binary types
    if lower.contains("blob") {
        return match db {
            DatabaseType::SQLite => TypeCategory::Binary,
            DatabaseType::MySql => TypeCategory::LargeBinary,
        };
    }
    if lower.contains("binary") {
        return TypeCategory::Binary;
    }

    // Character large objects
    if lower.contains("clob") || (lower.contains("text") && db == DatabaseType::MySql) {
        return TypeCategory::LargeText;
    }
    if lower.contains("char") || lower == "text" || lower == "enum" || lower == "set" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row to Value Trait
// =============================================================================

/// Trait for converting database rows to values.
pub trait RowToValues {
    fn column_labels(&self) -> Vec<String>;
    fn to_values(&self) -> Result<Vec<Value>, DriverError>;
}

impl RowToValues for MySqlRow {
    fn column_labels(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_values(&self) -> Result<Vec<Value>, DriverError> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                if self.try_get_raw(idx)?.is_null() {
                    return Ok(Value::Null);
                }
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySql);
                mysql::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl RowToValues for SqliteRow {
    fn column_labels(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_values(&self) -> Result<Vec<Value>, DriverError> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let raw = self.try_get_raw(idx)?;
                if raw.is_null() {
                    return Ok(Value::Null);
                }
                // Expression columns carry no declared type; use the value's
                let declared = col.type_info();
                let type_name = if declared.is_null() {
                    raw.type_info().name().to_string()
                } else {
                    declared.name().to_string()
                };
                let category = categorize_type(&type_name, DatabaseType::SQLite);
                sqlite::decode_column(self, idx, category)
            })
            .collect()
    }
}

/// Decode column `idx` as `Option<T>` and wrap it, mapping NULL to `Value::Null`.
macro_rules! decode_as {
    ($row:expr, $idx:expr, $ty:ty, $wrap:expr) => {
        $row.try_get::<Option<$ty>, _>($idx)
            .map(|v| v.map_or(Value::Null, $wrap))
            .map_err(DriverError::from)
    };
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        category: TypeCategory,
    ) -> Result<Value, DriverError> {
        match category {
            TypeCategory::Null => Ok(Value::Null),
            TypeCategory::SmallInt => decode_as!(row, idx, i16, Value::SmallInt),
            TypeCategory::Integer => decode_as!(row, idx, i32, Value::Int),
            TypeCategory::BigInt => decode_bigint(row, idx),
            TypeCategory::Float => decode_as!(row, idx, f32, Value::Float),
            TypeCategory::Double => decode_as!(row, idx, f64, Value::Double),
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Boolean => decode_as!(row, idx, bool, Value::Bool),
            TypeCategory::Text => decode_as!(row, idx, String, Value::Text),
            TypeCategory::LargeText => decode_as!(row, idx, String, Value::Clob),
            TypeCategory::Binary => decode_as!(row, idx, Vec<u8>, Value::Bytes),
            TypeCategory::LargeBinary => decode_as!(row, idx, Vec<u8>, Value::Blob),
            TypeCategory::Date => decode_as!(row, idx, chrono::NaiveDate, Value::Date),
            TypeCategory::Timestamp => {
                decode_as!(row, idx, chrono::NaiveDateTime, Value::Timestamp)
            }
            TypeCategory::Time => decode_as!(row, idx, chrono::NaiveTime, Value::Time),
            TypeCategory::Unknown => decode_as!(row, idx, String, Value::Text)
                .or_else(|_| decode_as!(row, idx, Vec<u8>, Value::Bytes)),
        }
    }

    fn decode_bigint(row: &MySqlRow, idx: usize) -> Result<Value, DriverError> {
        if let Ok(v) = decode_as!(row, idx, i64, Value::BigInt) {
            return Ok(v);
        }
        // Unsigned columns
        match row.try_get::<Option<u64>, _>(idx)? {
            Some(v) => i64::try_from(v).map(Value::BigInt).map_err(|_| {
                DriverError::new(format!("column {} value {} exceeds BIGINT range", idx, v))
            }),
            None => Ok(Value::Null),
        }
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> Result<Value, DriverError> {
        match row.try_get::<Option<RawDecimal>, _>(idx)? {
            Some(raw) => Decimal::from_str(&raw.0)
                .map(Value::Decimal)
                .map_err(|e| DriverError::new(format!("column {}: {}", idx, e))),
            None => Ok(Value::Null),
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        category: TypeCategory,
    ) -> Result<Value, DriverError> {
        match category {
            TypeCategory::Null => Ok(Value::Null),
            TypeCategory::SmallInt | TypeCategory::Integer | TypeCategory::BigInt => {
                decode_as!(row, idx, i64, Value::BigInt)
            }
            TypeCategory::Float | TypeCategory::Double | TypeCategory::Decimal => {
                decode_as!(row, idx, f64, Value::Double)
            }
            TypeCategory::Boolean => decode_as!(row, idx, bool, Value::Bool),
            TypeCategory::Binary | TypeCategory::LargeBinary => {
                decode_as!(row, idx, Vec<u8>, Value::Bytes)
            }
            // Dates are stored as text; keep the text when it is not in a recognised format
            TypeCategory::Date => decode_as!(row, idx, chrono::NaiveDate, Value::Date)
                .or_else(|_| decode_text(row, idx)),
            TypeCategory::Timestamp => {
                decode_as!(row, idx, chrono::NaiveDateTime, Value::Timestamp)
                    .or_else(|_| decode_text(row, idx))
            }
            TypeCategory::Time => decode_as!(row, idx, chrono::NaiveTime, Value::Time)
                .or_else(|_| decode_text(row, idx)),
            TypeCategory::Text | TypeCategory::LargeText | TypeCategory::Unknown => {
                decode_text(row, idx)
            }
        }
    }

    fn decode_text(row: &SqliteRow, idx: usize) -> Result<Value, DriverError> {
        decode_as!(row, idx, String, Value::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_mysql_types() {
        let db = DatabaseType::MySql;
        assert_eq!(categorize_type("INT", db), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT", db), TypeCategory::BigInt);
        assert_eq!(categorize_type("INT UNSIGNED", db), TypeCategory::BigInt);
        assert_eq!(categorize_type("SMALLINT", db), TypeCategory::SmallInt);
        assert_eq!(categorize_type("BOOLEAN", db), TypeCategory::Boolean);
        assert_eq!(categorize_type("DECIMAL", db), TypeCategory::Decimal);
        assert_eq!(categorize_type("DOUBLE", db), TypeCategory::Double);
        assert_eq!(categorize_type("FLOAT", db), TypeCategory::Float);
        assert_eq!(categorize_type("VARCHAR", db), TypeCategory::Text);
        assert_eq!(categorize_type("CHAR", db), TypeCategory::Text);
        assert_eq!(categorize_type("TEXT", db), TypeCategory::LargeText);
        assert_eq!(categorize_type("LONGTEXT", db), TypeCategory::LargeText);
        assert_eq!(categorize_type("VARBINARY", db), TypeCategory::Binary);
        assert_eq!(categorize_type("BLOB", db), TypeCategory::LargeBinary);
        assert_eq!(categorize_type("DATE", db), TypeCategory::Date);
        assert_eq!(categorize_type("DATETIME", db), TypeCategory::Timestamp);
        assert_eq!(categorize_type("TIMESTAMP", db), TypeCategory::Timestamp);
        assert_eq!(categorize_type("TIME", db), TypeCategory::Time);
        assert_eq!(categorize_type("GEOMETRY", db), TypeCategory::Unknown);
    }

    #[test]
    fn test_categorize_sqlite_types() {
        let db = DatabaseType::SQLite;
        assert_eq!(categorize_type("INTEGER", db), TypeCategory::BigInt);
        assert_eq!(categorize_type("REAL", db), TypeCategory::Double);
        assert_eq!(categorize_type("NUMERIC", db), TypeCategory::Double);
        assert_eq!(categorize_type("TEXT", db), TypeCategory::Text);
        assert_eq!(categorize_type("BLOB", db), TypeCategory::Binary);
        assert_eq!(categorize_type("DATETIME", db), TypeCategory::Timestamp);
        assert_eq!(categorize_type("NULL", db), TypeCategory::Null);
    }
}
