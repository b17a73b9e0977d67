//! Shared test helpers: a scripted in-memory driver and sample records.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use sqlframe::db::params::parse_markers;
use sqlframe::db::{Connection, Driver, MemoryCatalog, PreparedStatement, ResultSet};
use sqlframe::models::{Decimal, Value};
use sqlframe::{DriverError, RetryPolicy, SqlRegistry};

/// One statement execution seen by the mock.
#[derive(Debug, Clone)]
pub struct Execution {
    pub connection_id: u32,
    pub sql: String,
    pub bound: Vec<(String, Value)>,
}

/// Everything the mock records and everything a test can script.
#[derive(Debug, Default)]
pub struct MockState {
    pub acquired: u32,
    pub commits: u32,
    pub rollbacks: u32,
    pub closes: u32,
    pub prepared: u32,
    pub released: u32,
    pub executions: Vec<Execution>,

    /// Failures returned by successive executions, then success.
    pub execute_failures: VecDeque<DriverError>,
    pub fail_acquire: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub fail_liveness: bool,
    /// Rows returned by every query.
    pub rows: ResultSet,
    /// Count returned by every mutation.
    pub affected: u64,
    /// Called once, right after the next scripted failure is returned.
    pub on_failure: Option<FailureHook>,
}

pub struct FailureHook(Box<dyn FnOnce() + Send>);

impl FailureHook {
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(hook))
    }
}

impl fmt::Debug for FailureHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FailureHook")
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Make the next `n` executions fail with `code`.
    pub fn fail_next(&self, n: usize, code: i32) {
        let mut state = self.state();
        for _ in 0..n {
            state
                .execute_failures
                .push_back(DriverError::new("resource busy").with_code(code));
        }
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    async fn acquire(&self) -> Result<MockConnection, DriverError> {
        let mut state = self.state();
        if state.fail_acquire {
            return Err(DriverError::new("connection refused"));
        }
        state.acquired += 1;
        Ok(MockConnection {
            id: state.acquired,
            closed: false,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockConnection {
    pub id: u32,
    closed: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn run(&self, statement: &MockStatement) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::closed());
        }
        let mut state = self.state();
        state.executions.push(Execution {
            connection_id: self.id,
            sql: statement.sql.clone(),
            bound: statement.bound.clone(),
        });
        let Some(err) = state.execute_failures.pop_front() else {
            return Ok(());
        };
        let hook = state.on_failure.take();
        drop(state);
        if let Some(FailureHook(hook)) = hook {
            hook();
        }
        Err(err)
    }
}

impl Connection for MockConnection {
    type Statement = MockStatement;

    async fn prepare(&mut self, sql: &str) -> Result<MockStatement, DriverError> {
        if self.closed {
            return Err(DriverError::closed());
        }
        self.state().prepared += 1;
        Ok(MockStatement {
            sql: sql.to_string(),
            markers: parse_markers(sql).declared(),
            bound: Vec::new(),
            state: Arc::clone(&self.state),
        })
    }

    async fn execute_query(&mut self, statement: &mut MockStatement) -> Result<ResultSet, DriverError> {
        self.run(statement)?;
        Ok(self.state().rows.clone())
    }

    async fn execute_update(&mut self, statement: &mut MockStatement) -> Result<u64, DriverError> {
        self.run(statement)?;
        Ok(self.state().affected)
    }

    fn is_closed(&self) -> Result<bool, DriverError> {
        if self.state().fail_liveness {
            return Err(DriverError::new("liveness check failed"));
        }
        Ok(self.closed)
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = self.state();
        state.commits += 1;
        if state.fail_commit {
            return Err(DriverError::new("commit refused").with_code(-904));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        let mut state = self.state();
        state.rollbacks += 1;
        if state.fail_rollback {
            return Err(DriverError::new("rollback refused").with_code(-30108));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.state().closes += 1;
        }
        Ok(())
    }
}

pub struct MockStatement {
    sql: String,
    markers: Vec<String>,
    bound: Vec<(String, Value)>,
    state: Arc<Mutex<MockState>>,
}

impl PreparedStatement for MockStatement {
    fn marker_names(&self) -> &[String] {
        &self.markers
    }

    fn bind(&mut self, marker: &str, value: Value) -> Result<(), DriverError> {
        self.bound.push((marker.to_string(), value));
        Ok(())
    }
}

impl Drop for MockStatement {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.released += 1;
        }
    }
}

/// Record covering every bindable value type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllTypes {
    pub varchar_column: String,
    pub integer_column: i32,
    pub bigint_column: i64,
    pub double_column: f64,
    pub decimal_column: Option<Decimal>,
    pub date_column: Option<NaiveDate>,
    pub timestamp_column: Option<NaiveDateTime>,
    pub varbinary_column: Option<Vec<u8>>,
    pub clob_column: Option<String>,
}

sqlframe::impl_entity!(AllTypes {
    "varcharColumn" => varchar_column,
    "integerColumn" => integer_column,
    "bigintColumn" => bigint_column,
    "doubleColumn" => double_column,
    "decimalColumn" => decimal_column,
    "dateColumn" => date_column,
    "timestampColumn" => timestamp_column,
    "varbinaryColumn" => varbinary_column,
    "clobColumn" => clob_column,
});

impl AllTypes {
    pub fn sample() -> Self {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        Self {
            varchar_column: "alpha".to_string(),
            integer_column: 42,
            bigint_column: 9_000_000_000,
            double_column: 1.5,
            decimal_column: Some("12.50".parse().unwrap()),
            date_column: Some(date),
            timestamp_column: Some(date.and_hms_opt(13, 45, 0).unwrap()),
            varbinary_column: Some(vec![0, 1, 2, 255]),
            clob_column: Some("long text".to_string()),
        }
    }
}

/// Record with a field the executor refuses to bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flagged {
    pub flag_id: i32,
    pub enabled_flag: bool,
}

sqlframe::impl_entity!(Flagged {
    "flagId" => flag_id,
    "enabledFlag" => enabled_flag,
});

/// Registry over an in-memory catalog holding `statements`.
pub fn registry(
    statements: &[(&str, &str)],
    policy: RetryPolicy,
) -> (Arc<MemoryCatalog>, SqlRegistry) {
    let catalog: Arc<MemoryCatalog> = Arc::new(statements.iter().copied().collect());
    let registry = SqlRegistry::new(catalog.clone(), policy);
    (catalog, registry)
}

/// Retry policy treating `codes` as lock contention, with a short wait.
pub fn fast_retry(codes: &[i32], max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(codes.iter().copied(), max_retries, 10)
}
