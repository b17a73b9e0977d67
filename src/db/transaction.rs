//! Transaction coordinator.
//!
//! [`run`] executes a unit of work inside a transaction on the context's
//! connection. Calls nest: a `run` inside a unit of work joins the enclosing
//! transaction instead of starting its own.
//!
//! # Protocol
//!
//! 1. Acquire or reuse the context's connection.
//! 2. Push a handle on the context's transaction stack.
//! 3. Run the unit of work.
//! 4. On success pop the handle; commit when the stack is now empty.
//! 5. On failure:
//!    - connection failure: clear the stack, no rollback
//!    - failure already reported by a nested `run` that unwound the stack:
//!      pass it through unchanged
//!    - anything else: clear the stack and roll back once
//! 6. When no transaction remains in progress, close the connection and
//!    ignore a close failure. Inner invocations leave it open for the
//!    enclosing one.
//!
//! Dropping a `run` future before it completes abandons its handle. The
//! context then reports no transaction in progress, and its next connection
//! use closes the connection holding the abandoned work. An enclosing
//! invocation still running fails with [`DbError::Transaction`].
//!
//! Callers of `run` only ever see [`DbError::Transaction`] on failure.

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::db::connection::{ExecutionContext, TransactionHandle};
use crate::db::driver::Driver;
use crate::error::{DbError, DbResult, MessageId};

/// Run `work` as a transactional unit and return its result.
///
/// # Example
///
/// ```ignore
/// let user = transaction::run(&mut ctx, |ctx| {
///     Box::pin(async move { select_user.execute(ctx, &key).await })
/// })
/// .await?;
/// ```
pub async fn run<D, F, R>(ctx: &mut ExecutionContext<D>, work: F) -> DbResult<R>
where
    D: Driver,
    F: for<'c> FnOnce(&'c mut ExecutionContext<D>) -> BoxFuture<'c, DbResult<R>> + Send,
    R: Send,
{
    let outcome = match begin(ctx).await {
        Ok(handle) => {
            let result = match work(ctx).await {
                Ok(value) => finish(ctx, &handle).await.map(|()| value),
                Err(err) => Err(err),
            };
            // The handle outlives `abort` so the stack still counts this
            // invocation while the failure is handled.
            match result {
                Ok(value) => Ok(value),
                Err(err) => Err(abort(ctx, err).await),
            }
        }
        Err(err) => Err(abort(ctx, err).await),
    };

    if !ctx.in_transaction() {
        match ctx.close_connection().await {
            Ok(()) => debug!("Database connection closed"),
            Err(e) => debug!(error = %e, "Closing database connection failed, ignored"),
        }
    }
    outcome
}

/// Run `work` as a transactional unit that produces no value.
pub async fn run_unit<D, F>(ctx: &mut ExecutionContext<D>, work: F) -> DbResult<()>
where
    D: Driver,
    F: for<'c> FnOnce(&'c mut ExecutionContext<D>) -> BoxFuture<'c, DbResult<()>> + Send,
{
    run(ctx, work).await
}

async fn begin<D: Driver>(ctx: &mut ExecutionContext<D>) -> DbResult<TransactionHandle> {
    ctx.connection().await?;

    let handle = ctx.push();
    debug!(
        transaction_id = %handle.id(),
        depth = ctx.depth(),
        "Transaction started"
    );
    Ok(handle)
}

async fn finish<D: Driver>(
    ctx: &mut ExecutionContext<D>,
    handle: &TransactionHandle,
) -> DbResult<()> {
    if !ctx.pop(handle) {
        return Err(DbError::invalid_state(format!(
            "transaction {} is no longer on the stack",
            handle.id()
        )));
    }

    if !ctx.in_transaction() {
        ctx.commit().await?;
        let elapsed_ms = (chrono::Utc::now() - handle.started_at()).num_milliseconds();
        debug!(
            transaction_id = %handle.id(),
            elapsed_ms,
            "Transaction committed"
        );
    }
    Ok(())
}

/// Turn a failure inside a transactional unit into a transaction error,
/// rolling back where needed.
async fn abort<D: Driver>(ctx: &mut ExecutionContext<D>, err: DbError) -> DbError {
    match err {
        // A nested invocation on this context already unwound the stack.
        DbError::Transaction { .. } if !ctx.in_transaction() => err,
        DbError::Connection { .. } => {
            ctx.clear();
            warn!(error = %err, "Transaction aborted without a connection");
            DbError::transaction(MessageId::Dbe00001, err, None)
        }
        // The stack was cleared by a nested invocation that already rolled
        // back, or a nested invocation was abandoned.
        DbError::InvalidState { .. } => {
            ctx.clear();
            warn!(error = %err, "Transaction stack out of step");
            DbError::transaction(MessageId::Dbe00007, err, None)
        }
        DbError::Bind { .. }
        | DbError::Mapping { .. }
        | DbError::SqlExecute { .. }
        | DbError::PessimisticLocking { .. }
        | DbError::Commit { .. }
        | DbError::Application { .. }
        | DbError::Transaction { .. } => {
            ctx.clear();
            match ctx.rollback().await {
                Ok(()) => {
                    debug!(error = %err, "Transaction rolled back");
                    DbError::transaction(MessageId::Dbe00007, err, None)
                }
                Err(rollback) => {
                    warn!(
                        error = %err,
                        rollback_error = %rollback,
                        "Transaction rollback failed"
                    );
                    DbError::transaction(MessageId::Dbe00008, err, Some(rollback))
                }
            }
        }
    }
}
