//! Statement execution.
//!
//! Executes one statement through a connection:
//! - prepares the SQL text
//! - binds the parameters whose names the statement declares as markers
//! - runs it as a query or a mutation depending on its class
//! - hands the result to the caller's parser
//!
//! The prepared statement is dropped, and so released, on every exit path.

use tracing::debug;

use crate::db::binder::ParameterSet;
use crate::db::driver::{Connection, PreparedStatement};
use crate::db::parser::{ExecutionResult, ResultParser};
use crate::db::statement::{StatementClass, StatementSpec};
use crate::error::{DbError, DbResult};

/// Execute `sql` as the statement described by `spec`.
///
/// Driver failures are reported as [`DbError::SqlExecute`]; a parameter of a
/// type the driver cannot bind is reported as [`DbError::Bind`].
pub async fn execute<C, P>(
    conn: &mut C,
    spec: &StatementSpec,
    sql: &str,
    parameters: Option<&ParameterSet>,
    parser: &P,
) -> DbResult<P::Output>
where
    C: Connection,
    P: ResultParser,
{
    let sql_error = |e| DbError::sql_execute(spec.statement_id.as_str(), e);

    let mut statement = conn.prepare(sql).await.map_err(sql_error)?;

    if let Some(params) = parameters.filter(|p| !p.is_empty()) {
        let bound = bind_declared(&mut statement, params, spec)?;
        debug!(
            statement_id = %spec.statement_id,
            bound,
            supplied = params.len(),
            "Parameters bound"
        );
    }

    let result = match spec.class {
        StatementClass::Query => {
            ExecutionResult::Rows(conn.execute_query(&mut statement).await.map_err(sql_error)?)
        }
        StatementClass::Mutation => ExecutionResult::Affected(
            conn.execute_update(&mut statement).await.map_err(sql_error)?,
        ),
    };
    drop(statement);

    parser.parse(result)
}

/// Bind every parameter the statement declares a marker for.
///
/// Returns the number of bound parameters.
fn bind_declared<S: PreparedStatement>(
    statement: &mut S,
    params: &ParameterSet,
    spec: &StatementSpec,
) -> DbResult<usize> {
    let declared: Vec<_> = {
        let markers = statement.marker_names();
        params
            .iter()
            .filter(|&(name, _)| markers.contains(name))
            .collect()
    };

    for &(name, value) in &declared {
        if !value.is_bindable() {
            return Err(DbError::bind(name.as_str(), value.type_name()));
        }
        statement
            .bind(name, value.clone())
            .map_err(|e| DbError::sql_execute(spec.statement_id.as_str(), e))?;
    }
    Ok(declared.len())
}
