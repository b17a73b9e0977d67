//! Result parsers: turn an execution result into the caller's value.

use std::fmt;
use std::marker::PhantomData;

use crate::db::binder::from_row;
use crate::db::driver::{ResultSet, Row};
use crate::error::{DbError, DbResult};
use crate::models::Entity;

/// Raw outcome of executing one statement.
#[derive(Debug)]
pub enum ExecutionResult {
    Rows(ResultSet),
    Affected(u64),
}

pub trait ResultParser: Send + Sync + Clone + 'static {
    type Output: Send;

    fn parse(&self, result: ExecutionResult) -> DbResult<Self::Output>;
}

fn expect_rows(result: ExecutionResult) -> DbResult<ResultSet> {
    match result {
        ExecutionResult::Rows(rows) => Ok(rows),
        ExecutionResult::Affected(_) => Err(DbError::mapping(
            "statement returned an update count where rows were expected",
        )),
    }
}

/// Affected-row count of a mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffectedRows;

impl ResultParser for AffectedRows {
    type Output = u64;

    fn parse(&self, result: ExecutionResult) -> DbResult<u64> {
        match result {
            ExecutionResult::Affected(count) => Ok(count),
            ExecutionResult::Rows(_) => Ok(0),
        }
    }
}

/// First row mapped onto `E`, if any.
pub struct SingleRecord<E>(PhantomData<fn() -> E>);

/// Every row mapped onto `E`.
pub struct RecordList<E>(PhantomData<fn() -> E>);

macro_rules! impl_marker_traits {
    ($($name:ident),+) => {
        $(
            impl<E> $name<E> {
                pub fn new() -> Self {
                    Self(PhantomData)
                }
            }

            impl<E> Default for $name<E> {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl<E> Clone for $name<E> {
                fn clone(&self) -> Self {
                    Self::new()
                }
            }

            impl<E> fmt::Debug for $name<E> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}<{}>", stringify!($name), std::any::type_name::<E>())
                }
            }
        )+
    };
}

impl_marker_traits!(SingleRecord, RecordList);

impl<E: Entity> ResultParser for SingleRecord<E> {
    type Output = Option<E>;

    fn parse(&self, result: ExecutionResult) -> DbResult<Option<E>> {
        expect_rows(result)?
            .into_iter()
            .next()
            .map(from_row)
            .transpose()
    }
}

impl<E: Entity> ResultParser for RecordList<E> {
    type Output = Vec<E>;

    fn parse(&self, result: ExecutionResult) -> DbResult<Vec<E>> {
        expect_rows(result)?.into_iter().map(from_row).collect()
    }
}

/// Rows as returned by the driver, without mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRows;

impl ResultParser for RawRows {
    type Output = Vec<Row>;

    fn parse(&self, result: ExecutionResult) -> DbResult<Vec<Row>> {
        Ok(expect_rows(result)?.into_iter().collect())
    }
}
