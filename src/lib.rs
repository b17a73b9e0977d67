//! sqlframe
//!
//! A small data-access layer over SQL databases (SQLite, MySQL). Statements
//! are looked up by id in a catalog, parameters are bound by marker name from
//! records, results are mapped back onto records, and units of work run in
//! nested transactions with retry on lock contention.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, DatabaseSettings, RetryPolicy};
pub use db::{ExecutionContext, SqlRegistry, SqlxDriver, transaction};
pub use error::{DbError, DbResult, DriverError, MessageId};
pub use models::{Entity, Value};
