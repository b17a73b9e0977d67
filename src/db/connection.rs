//! Per-task execution context.
//!
//! An [`ExecutionContext`] belongs to one logical task. It holds at most one
//! live connection and the stack of nested transactional invocations.
//! Nothing in it is shared, so no locking is needed: concurrent tasks each
//! own their own context.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::db::driver::{Connection, Driver};
use crate::error::{DbError, DbResult, DriverError, MessageId};

/// Marker for one transactional invocation on the stack.
///
/// The invocation holds its handle for as long as it runs. Dropping the
/// handle without popping it, as a cancelled invocation does, leaves an
/// abandoned frame that the context discards on its next connection use.
#[derive(Debug)]
pub struct TransactionHandle {
    id: String,
    started_at: DateTime<Utc>,
    owner: Arc<()>,
}

impl TransactionHandle {
    fn new() -> Self {
        Self {
            id: format!("tx_{}", uuid::Uuid::new_v4().simple()),
            started_at: Utc::now(),
            owner: Arc::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Stack entry for a handle.
struct Frame {
    id: String,
    owner: Weak<()>,
}

impl Frame {
    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

pub struct ExecutionContext<D: Driver> {
    driver: Arc<D>,
    connection: Option<D::Connection>,
    stack: Vec<Frame>,
}

impl<D: Driver> ExecutionContext<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            connection: None,
            stack: Vec::new(),
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Get the context's connection, acquiring a new one when none is held or
    /// the held one is closed.
    ///
    /// A failing liveness check counts as closed. Acquisition failure is a
    /// [`DbError::Connection`].
    pub async fn connection(&mut self) -> DbResult<&mut D::Connection> {
        self.discard_abandoned().await;

        let reusable = match &self.connection {
            Some(conn) => match conn.is_closed() {
                Ok(closed) => !closed,
                Err(e) => {
                    debug!(error = %e, "Connection liveness check failed, replacing connection");
                    false
                }
            },
            None => false,
        };

        if !reusable {
            debug!("Acquiring database connection");
            let conn = self
                .driver
                .acquire()
                .await
                .map_err(|e| DbError::connection(MessageId::Dbe00003, e))?;
            debug!("Database connection acquired");
            self.connection = Some(conn);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| DbError::invalid_state("connection slot empty after acquisition"))
    }

    /// Drop the stack and the connection if an invocation went away without
    /// unwinding. Closing the connection discards the work it left open.
    async fn discard_abandoned(&mut self) {
        let Some(at) = self.stack.iter().position(|frame| !frame.is_live()) else {
            return;
        };
        warn!(
            transaction_id = %self.stack[at].id,
            depth = self.stack.len(),
            "Transaction abandoned without unwinding, discarding its connection"
        );
        self.stack.clear();
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Closing abandoned connection failed, ignored");
            }
        }
    }

    /// Check whether a connection is held, without checking liveness.
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Close the held connection, if any. The slot keeps the closed
    /// connection so the next use replaces it.
    pub async fn close_connection(&mut self) -> Result<(), DriverError> {
        match self.connection.as_mut() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    pub(crate) async fn commit(&mut self) -> DbResult<()> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| DbError::invalid_state("commit without a connection"))?;
        conn.commit().await.map_err(DbError::commit)
    }

    /// Roll back on the held connection. Returns the driver failure as-is so
    /// the coordinator can attach it to the transaction error.
    pub(crate) async fn rollback(&mut self) -> Result<(), DriverError> {
        match self.connection.as_mut() {
            Some(conn) => conn.rollback().await,
            None => Err(DriverError::closed()),
        }
    }

    pub(crate) fn push(&mut self) -> TransactionHandle {
        let handle = TransactionHandle::new();
        self.stack.push(Frame {
            id: handle.id.clone(),
            owner: Arc::downgrade(&handle.owner),
        });
        handle
    }

    /// Pop `handle` off the stack. Returns false if it is not on top.
    pub(crate) fn pop(&mut self, handle: &TransactionHandle) -> bool {
        if self.stack.last().is_some_and(|frame| frame.id == handle.id) {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }

    /// Number of transactional invocations in progress. Frames above an
    /// abandoned one do not count.
    pub fn depth(&self) -> usize {
        self.stack.iter().take_while(|frame| frame.is_live()).count()
    }

    pub fn in_transaction(&self) -> bool {
        self.depth() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ids_are_unique() {
        let a = TransactionHandle::new();
        let b = TransactionHandle::new();
        assert!(a.id().starts_with("tx_"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_dropped_handle_leaves_abandoned_frame() {
        let frame = {
            let handle = TransactionHandle::new();
            Frame {
                id: handle.id.clone(),
                owner: Arc::downgrade(&handle.owner),
            }
        };
        assert!(!frame.is_live());
    }
}
