//! Driver interface used by the execution engine.
//!
//! The engine never talks to a database directly. It goes through three
//! traits:
//! - [`Driver`]: the connection source
//! - [`Connection`]: prepare, execute, commit, rollback, close
//! - [`PreparedStatement`]: named marker enumeration and binding
//!
//! [`crate::db::pool::SqlxDriver`] implements them on top of sqlx pools.

use std::future::Future;
use std::sync::Arc;

use crate::error::DriverError;
use crate::models::Value;

/// Source of database connections.
pub trait Driver: Send + Sync + 'static {
    type Connection: Connection;

    /// Acquire a fresh connection.
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection, DriverError>> + Send;
}

/// A live database connection with auto-commit disabled.
pub trait Connection: Send {
    type Statement: PreparedStatement;

    fn prepare(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Self::Statement, DriverError>> + Send;

    /// Execute a statement that returns rows.
    fn execute_query(
        &mut self,
        statement: &mut Self::Statement,
    ) -> impl Future<Output = Result<ResultSet, DriverError>> + Send;

    /// Execute a statement and return the affected-row count.
    fn execute_update(
        &mut self,
        statement: &mut Self::Statement,
    ) -> impl Future<Output = Result<u64, DriverError>> + Send;

    /// Report whether the connection is closed.
    ///
    /// An error means the state could not be determined.
    fn is_closed(&self) -> Result<bool, DriverError>;

    fn commit(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// A prepared statement. Dropping it releases it.
pub trait PreparedStatement: Send {
    /// Named markers declared by the statement, without the leading `:`.
    fn marker_names(&self) -> &[String];

    fn bind(&mut self, marker: &str, value: Value) -> Result<(), DriverError>;
}

/// One result row. Column labels are shared by all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get a value by column label, ignoring ASCII case.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
            .and_then(|idx| self.values.get(idx))
    }

    /// Iterate `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn into_parts(self) -> (Arc<Vec<String>>, Vec<Value>) {
        (self.columns, self.values)
    }
}

/// Rows returned by a query, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<Vec<String>>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Append a row; values are matched to the column labels by position.
    pub fn push(&mut self, values: Vec<Value>) {
        self.rows.push(Row::new(Arc::clone(&self.columns), values));
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
