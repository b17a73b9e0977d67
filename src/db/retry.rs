//! Retrying execution wrapper.
//!
//! Runs a statement through the executor on the context's connection. A
//! failure whose vendor code the [`RetryPolicy`] lists as lock contention is
//! retried after a fixed wait, up to `max_retries` times; past that it becomes
//! a [`DbError::PessimisticLocking`]. Any other failure is returned at once.

use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::db::binder::ToParameters;
use crate::db::catalog::StatementCatalog;
use crate::db::connection::ExecutionContext;
use crate::db::driver::Driver;
use crate::db::executor;
use crate::db::parser::ResultParser;
use crate::db::statement::StatementSpec;
use crate::error::{DbError, DbResult, DriverError};

/// Execute the statement described by `spec`, retrying on lock contention.
///
/// The SQL text is looked up in `catalog` before every attempt, so a catalog
/// that reloads its source picks up new text between attempts.
pub async fn execute_with_retry<D, P, X>(
    ctx: &mut ExecutionContext<D>,
    spec: &StatementSpec,
    catalog: &dyn StatementCatalog,
    policy: &RetryPolicy,
    record: Option<&P>,
    parser: &X,
) -> DbResult<X::Output>
where
    D: Driver,
    P: ToParameters + ?Sized,
    X: ResultParser,
{
    let parameters = record.map(|r| r.to_parameters());
    let mut remaining = policy.max_retries;
    let mut attempt: u32 = 1;

    loop {
        let sql = catalog.lookup(&spec.statement_id).ok_or_else(|| {
            DbError::sql_execute(
                spec.statement_id.as_str(),
                DriverError::new(format!(
                    "Statement '{}' is not defined in the catalog",
                    spec.statement_id
                )),
            )
        })?;

        info!(
            statement_id = %spec.statement_id,
            sql = %sql,
            params = ?parameters,
            attempt,
            "Executing statement"
        );

        let conn = ctx.connection().await?;
        match executor::execute(conn, spec, &sql, parameters.as_ref(), parser).await {
            Ok(output) => return Ok(output),
            Err(DbError::SqlExecute {
                statement_id,
                source,
            }) if policy.is_retryable(source.code) => {
                if remaining == 0 {
                    warn!(
                        statement_id = %statement_id,
                        attempts = attempt,
                        error_code = ?source.code,
                        "Lock contention retries exhausted"
                    );
                    return Err(DbError::pessimistic_locking(
                        statement_id,
                        parameters,
                        source,
                    ));
                }
                remaining -= 1;
                warn!(
                    statement_id = %statement_id,
                    remaining,
                    error_code = ?source.code,
                    wait_ms = policy.wait_ms,
                    "Lock contention, retrying statement"
                );
                tokio::time::sleep(policy.wait()).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
