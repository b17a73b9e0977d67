//! Named parameter markers and parameter binding.
//!
//! SQL text in the catalog uses named markers (`:USER_ID`). sqlx binds
//! positionally, so markers are rewritten to `?` and the value of each marker
//! is bound once per occurrence.

use crate::models::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Sqlite};

/// SQL text with its named markers rewritten to positional `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSql {
    /// Rewritten SQL text.
    pub sql: String,
    /// Marker names in order of occurrence; a name may repeat.
    pub occurrences: Vec<String>,
}

impl ParsedSql {
    /// Distinct marker names in order of first occurrence.
    pub fn declared(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.occurrences.len());
        for name in &self.occurrences {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Find the named markers in `sql`.
///
/// Markers inside string literals, quoted identifiers and comments are left
/// alone, as are `::` casts.
pub fn parse_markers(sql: &str) -> ParsedSql {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut occurrences = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = find_closing(&chars, i + 1, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = chars[i + 2..]
                    .windows(2)
                    .position(|w| w == ['*', '/'])
                    .map_or(chars.len(), |p| i + 2 + p + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|&ch| is_marker_start(ch)) => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| !is_marker_char(ch))
                    .map_or(chars.len(), |p| start + p);
                occurrences.push(chars[start..end].iter().collect());
                out.push('?');
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    ParsedSql {
        sql: out,
        occurrences,
    }
}

/// Index just past the closing quote, honouring doubled-quote escapes.
fn find_closing(chars: &[char], mut i: usize, quote: char) -> usize {
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn is_marker_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_marker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Bind a value to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Text(v) | Value::Clob(v) => query.bind(v.as_str()),
        Value::Int(v) => query.bind(*v),
        Value::BigInt(v) => query.bind(*v),
        Value::Double(v) => query.bind(*v),
        // MySQL converts the exact textual form to DECIMAL
        Value::Decimal(v) => query.bind(v.as_str()),
        Value::Date(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::Bytes(v) | Value::Blob(v) => query.bind(v.as_slice()),
        Value::Bool(v) => query.bind(*v),
        Value::SmallInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
    }
}

/// Bind a value to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Text(v) | Value::Clob(v) => query.bind(v.as_str()),
        Value::Int(v) => query.bind(*v),
        Value::BigInt(v) => query.bind(*v),
        Value::Double(v) => query.bind(*v),
        // SQLite has no exact numeric type, store as text
        Value::Decimal(v) => query.bind(v.as_str()),
        Value::Date(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::Bytes(v) | Value::Blob(v) => query.bind(v.as_slice()),
        Value::Bool(v) => query.bind(*v),
        Value::SmallInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
    }
}
