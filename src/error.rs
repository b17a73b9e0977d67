//! Error types for sqlframe.
//!
//! Two layers are defined here:
//! - [`DriverError`]: a failure reported by the database driver, carrying the
//!   vendor error code and SQL state when the driver provides them.
//! - [`DbError`]: the failure taxonomy of the data-access layer. Every variant
//!   that corresponds to a catalogued message exposes its [`MessageId`].

use std::fmt;

use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::config::RetryPolicy;
use crate::db::binder::ParameterSet;

/// Boxed error used as an opaque cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Catalogued message identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Transaction aborted because no connection could be obtained.
    Dbe00001,
    /// A result row could not be mapped onto a record.
    Dbe00002,
    /// A connection could not be acquired from the data source.
    Dbe00003,
    /// The configured data source could not be resolved.
    Dbe00004,
    /// A parameter value has a type the driver cannot bind.
    Dbe00006,
    /// The transaction was rolled back.
    Dbe00007,
    /// Rolling the transaction back failed.
    Dbe00008,
    /// Lock contention persisted past the retry limit.
    Dbe00009,
}

impl MessageId {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Dbe00001 => "DBE00001",
            Self::Dbe00002 => "DBE00002",
            Self::Dbe00003 => "DBE00003",
            Self::Dbe00004 => "DBE00004",
            Self::Dbe00006 => "DBE00006",
            Self::Dbe00007 => "DBE00007",
            Self::Dbe00008 => "DBE00008",
            Self::Dbe00009 => "DBE00009",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Dbe00001 => "Transaction aborted: no database connection available",
            Self::Dbe00002 => "Failed to map result row onto record",
            Self::Dbe00003 => "Failed to acquire database connection",
            Self::Dbe00004 => "Failed to resolve data source",
            Self::Dbe00006 => "Unsupported parameter type",
            Self::Dbe00007 => "Transaction rolled back",
            Self::Dbe00008 => "Transaction rollback failed",
            Self::Dbe00009 => "Lock contention retries exhausted",
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id(), self.text())
    }
}

/// A failure reported by the database driver.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// Vendor error code (MySQL error number, SQLite primary result code).
    pub code: Option<i32>,
    pub sql_state: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            sql_state: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Error for an operation attempted on a connection that was already closed.
    pub fn closed() -> Self {
        Self::new("Connection is closed")
    }
}

/// Convert sqlx errors to DriverError, keeping vendor codes.
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message().to_string();
            let sql_state = db_err.code().map(|c| c.to_string());
            let code = match db_err.try_downcast_ref::<MySqlDatabaseError>() {
                Some(mysql) => Some(i32::from(mysql.number())),
                // SQLite reports the extended result code; the low byte is the primary code
                None => sql_state
                    .as_deref()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff),
            };
            return Self {
                message,
                code,
                sql_state,
                source: Some(Box::new(err)),
            };
        }

        let message = match &err {
            sqlx::Error::PoolClosed => "Connection pool is closed".to_string(),
            sqlx::Error::PoolTimedOut => "Timed out acquiring a pooled connection".to_string(),
            sqlx::Error::Io(io_err) => format!("I/O error: {}", io_err),
            sqlx::Error::Tls(tls_err) => format!("TLS error: {}", tls_err),
            sqlx::Error::Protocol(msg) => format!("Protocol error: {}", msg),
            sqlx::Error::ColumnDecode { index, source } => {
                format!("Failed to decode column {}: {}", index, source)
            }
            other => other.to_string(),
        };
        Self::new(message).with_source(err)
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{message_id}: {source}")]
    Connection {
        message_id: MessageId,
        #[source]
        source: DriverError,
    },

    #[error("{}: marker {marker} holds a value of type {value_type}", MessageId::Dbe00006)]
    Bind {
        marker: String,
        value_type: &'static str,
    },

    #[error("{}: {message}", MessageId::Dbe00002)]
    Mapping {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("SQL execution failed (statement: {statement_id}): {source}")]
    SqlExecute {
        statement_id: String,
        #[source]
        source: DriverError,
    },

    #[error("{} (statement: {statement_id}): {source}", MessageId::Dbe00009)]
    PessimisticLocking {
        statement_id: String,
        parameters: Option<ParameterSet>,
        #[source]
        source: DriverError,
    },

    #[error("{message_id}: {cause}{}", rollback_suffix(.rollback))]
    Transaction {
        message_id: MessageId,
        #[source]
        cause: Box<DbError>,
        rollback: Option<DriverError>,
    },

    #[error("Commit failed: {source}")]
    Commit {
        #[source]
        source: DriverError,
    },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("{message}")]
    Application {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

fn rollback_suffix(rollback: &Option<DriverError>) -> String {
    match rollback {
        Some(err) => format!(" (rollback failed: {})", err),
        None => String::new(),
    }
}

impl DbError {
    /// Create a connection error.
    pub fn connection(message_id: MessageId, source: DriverError) -> Self {
        Self::Connection { message_id, source }
    }

    /// Create a bind error for a marker whose value the driver cannot accept.
    pub fn bind(marker: impl Into<String>, value_type: &'static str) -> Self {
        Self::Bind {
            marker: marker.into(),
            value_type,
        }
    }

    /// Create a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
            source: None,
        }
    }

    /// Create a mapping error wrapping its cause.
    pub fn mapping_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Mapping {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a SQL execution error.
    pub fn sql_execute(statement_id: impl Into<String>, source: DriverError) -> Self {
        Self::SqlExecute {
            statement_id: statement_id.into(),
            source,
        }
    }

    /// Create a pessimistic locking error.
    pub fn pessimistic_locking(
        statement_id: impl Into<String>,
        parameters: Option<ParameterSet>,
        source: DriverError,
    ) -> Self {
        Self::PessimisticLocking {
            statement_id: statement_id.into(),
            parameters,
            source,
        }
    }

    /// Create a transaction error.
    pub fn transaction(
        message_id: MessageId,
        cause: DbError,
        rollback: Option<DriverError>,
    ) -> Self {
        Self::Transaction {
            message_id,
            cause: Box::new(cause),
            rollback,
        }
    }

    /// Create a commit error.
    pub fn commit(source: DriverError) -> Self {
        Self::Commit { source }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an application error raised by a unit of work.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            source: None,
        }
    }

    /// Get the catalogued message id, if this error has one.
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::Connection { message_id, .. } | Self::Transaction { message_id, .. } => {
                Some(*message_id)
            }
            Self::Bind { .. } => Some(MessageId::Dbe00006),
            Self::Mapping { .. } => Some(MessageId::Dbe00002),
            Self::PessimisticLocking { .. } => Some(MessageId::Dbe00009),
            Self::SqlExecute { .. }
            | Self::Commit { .. }
            | Self::InvalidState { .. }
            | Self::Application { .. } => None,
        }
    }

    /// The driver error this error reports, if any.
    ///
    /// For a transaction error whose rollback failed this is the rollback failure.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Connection { source, .. }
            | Self::SqlExecute { source, .. }
            | Self::PessimisticLocking { source, .. }
            | Self::Commit { source } => Some(source),
            Self::Transaction {
                cause, rollback, ..
            } => rollback.as_ref().or_else(|| cause.driver_error()),
            Self::Bind { .. }
            | Self::Mapping { .. }
            | Self::InvalidState { .. }
            | Self::Application { .. } => None,
        }
    }

    /// Get the vendor error code, if available.
    pub fn error_code(&self) -> Option<i32> {
        self.driver_error().and_then(|e| e.code)
    }

    /// Get the SQL state, if available.
    pub fn sql_state(&self) -> Option<&str> {
        self.driver_error().and_then(|e| e.sql_state.as_deref())
    }

    /// Get the rollback failure recorded on a transaction error.
    pub fn rollback_error(&self) -> Option<&DriverError> {
        match self {
            Self::Transaction { rollback, .. } => rollback.as_ref(),
            _ => None,
        }
    }

    /// Check if this is a SQL execution error with a code the policy retries.
    pub fn is_retryable_with(&self, policy: &RetryPolicy) -> bool {
        match self {
            Self::SqlExecute { source, .. } => policy.is_retryable(source.code),
            _ => false,
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn lock_timeout() -> DriverError {
        DriverError::new("lock wait timeout")
            .with_code(-913)
            .with_sql_state("57033")
    }

    #[test]
    fn test_message_id_display() {
        assert_eq!(MessageId::Dbe00001.id(), "DBE00001");
        assert_eq!(
            MessageId::Dbe00007.to_string(),
            "[DBE00007] Transaction rolled back"
        );
    }

    #[test]
    fn test_bind_error_names_marker_and_type() {
        let err = DbError::bind("BOOL_COLUMN", "BOOLEAN");
        let msg = err.to_string();
        assert!(msg.contains("DBE00006"));
        assert!(msg.contains("BOOL_COLUMN"));
        assert!(msg.contains("BOOLEAN"));
        assert_eq!(err.message_id(), Some(MessageId::Dbe00006));
    }

    #[test]
    fn test_sql_execute_exposes_code_and_state() {
        let err = DbError::sql_execute("selectUser", lock_timeout());
        assert_eq!(err.error_code(), Some(-913));
        assert_eq!(err.sql_state(), Some("57033"));
        assert_eq!(err.message_id(), None);
    }

    #[test]
    fn test_transaction_error_keeps_cause_chain() {
        let inner = DbError::sql_execute("insertUser", DriverError::new("duplicate key"));
        let err = DbError::transaction(MessageId::Dbe00007, inner, None);
        assert_eq!(err.message_id(), Some(MessageId::Dbe00007));
        assert!(err.rollback_error().is_none());

        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("insertUser"));
    }

    #[test]
    fn test_transaction_error_reports_rollback_failure() {
        let inner = DbError::application("boom");
        let rollback = DriverError::new("connection reset").with_code(-30081);
        let err = DbError::transaction(MessageId::Dbe00008, inner, Some(rollback));
        assert_eq!(err.error_code(), Some(-30081));
        assert!(err.to_string().contains("rollback failed: connection reset"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_retryable_only_for_sql_execute() {
        let policy = RetryPolicy::default();
        assert!(DbError::sql_execute("s", lock_timeout()).is_retryable_with(&policy));
        assert!(
            !DbError::sql_execute("s", DriverError::new("syntax").with_code(-104))
                .is_retryable_with(&policy)
        );
        assert!(
            !DbError::pessimistic_locking("s", None, lock_timeout()).is_retryable_with(&policy)
        );
    }
}
