//! Record to parameter-set and row to record mapping.
//!
//! Field names are camelCase (`varcharColumn`); markers and column labels
//! are upper snake case (`VARCHAR_COLUMN`).

use std::collections::BTreeMap;

use crate::db::driver::Row;
use crate::error::{DbError, DbResult};
use crate::models::{Entity, Value};

/// Marker name to value, built fresh for every execution.
pub type ParameterSet = BTreeMap<String, Value>;

/// Convert a camelCase field name to an upper snake case marker name.
///
/// Every upper-case character is preceded by `_`; every other character is
/// upper-cased.
pub fn to_snake_upper(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() * 2);
    for c in camel.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.push(c);
        } else {
            out.extend(c.to_uppercase());
        }
    }
    out
}

/// Convert an upper snake case column label to a camelCase field name.
///
/// The character after a `_` is upper-cased, every other character is
/// lower-cased, and a trailing lone `_` is kept.
pub fn to_camel(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut chars = snake.chars();
    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.next() {
                Some(next) => out.extend(next.to_uppercase()),
                None => out.push('_'),
            }
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Anything that can supply statement parameters.
pub trait ToParameters: Send + Sync {
    fn to_parameters(&self) -> ParameterSet;
}

impl<E: Entity> ToParameters for E {
    fn to_parameters(&self) -> ParameterSet {
        to_parameters(self)
    }
}

impl ToParameters for ParameterSet {
    fn to_parameters(&self) -> ParameterSet {
        self.clone()
    }
}

/// Build the parameter set of a record: one entry per declared field.
pub fn to_parameters<E: Entity>(record: &E) -> ParameterSet {
    E::fields()
        .iter()
        .map(|field| (to_snake_upper(field.name), (field.get)(record)))
        .collect()
}

/// Normalise a column value before it is assigned to a field.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::Text(s) => Value::Text(s.trim().to_string()),
        Value::Clob(s) => Value::Text(s),
        Value::Blob(b) => Value::Bytes(b),
        other => other,
    }
}

/// Build a record from a row by assigning each column to the field named
/// after its label.
pub fn from_row<E: Entity>(row: Row) -> DbResult<E> {
    let (columns, values) = row.into_parts();
    let mut record = E::default();

    for (label, value) in columns.iter().zip(values) {
        let name = to_camel(label);
        let field = E::field(&name).ok_or_else(|| {
            DbError::mapping(format!("column {} has no matching field '{}'", label, name))
        })?;
        (field.set)(&mut record, coerce(value)).map_err(|e| {
            DbError::mapping_with(format!("column {} cannot be assigned to '{}'", label, name), e)
        })?;
    }
    Ok(record)
}
