//! Database access layer.
//!
//! This module provides:
//! - The driver interface and its sqlx-backed implementation
//! - Statement catalogs and statement definitions
//! - Parameter binding and result mapping
//! - Statement execution with lock-contention retry
//! - Nested transaction coordination over a per-task execution context
//! - Database dispatch macros for reducing code duplication

pub mod binder;
pub mod catalog;
pub mod connection;
pub mod driver;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod params;
pub mod parser;
pub mod pool;
pub mod retry;
pub mod statement;
pub mod transaction;
pub mod types;

pub use binder::{ParameterSet, ToParameters, from_row, to_parameters};
pub use catalog::{MemoryCatalog, PropertiesCatalog, StatementCatalog};
pub use connection::{ExecutionContext, TransactionHandle};
pub use driver::{Connection, Driver, PreparedStatement, ResultSet, Row};
pub use macros::DatabaseType;
pub use parser::{AffectedRows, ExecutionResult, RawRows, RecordList, ResultParser, SingleRecord};
pub use pool::{DbPool, SqlxConnection, SqlxDriver};
pub use statement::{SqlRegistry, Statement, StatementClass, StatementSpec};
