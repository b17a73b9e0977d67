//! Statement definitions.
//!
//! A [`SqlRegistry`] ties a statement catalog to a retry policy and hands out
//! typed [`Statement`]s. Each statement knows its id, its class, and how its
//! result is parsed; its SQL text is looked up in the catalog every time it
//! runs.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::RetryPolicy;
use crate::db::binder::ToParameters;
use crate::db::catalog::StatementCatalog;
use crate::db::connection::ExecutionContext;
use crate::db::driver::Driver;
use crate::db::parser::{AffectedRows, RawRows, RecordList, ResultParser, SingleRecord};
use crate::db::retry::execute_with_retry;
use crate::error::DbResult;
use crate::models::Entity;

/// How a statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    /// Returns rows.
    Query,
    /// Returns an affected-row count.
    Mutation,
}

impl fmt::Display for StatementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSpec {
    pub statement_id: String,
    pub class: StatementClass,
}

impl StatementSpec {
    pub fn new(statement_id: impl Into<String>, class: StatementClass) -> Self {
        Self {
            statement_id: statement_id.into(),
            class,
        }
    }
}

/// Factory for statements sharing one catalog and retry policy.
#[derive(Clone)]
pub struct SqlRegistry {
    catalog: Arc<dyn StatementCatalog>,
    retry: Arc<RetryPolicy>,
}

impl SqlRegistry {
    pub fn new(catalog: Arc<dyn StatementCatalog>, retry: RetryPolicy) -> Self {
        Self {
            catalog,
            retry: Arc::new(retry),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Declare a statement with an explicit class and parser.
    pub fn define<P, X: ResultParser>(
        &self,
        statement_id: impl Into<String>,
        class: StatementClass,
        parser: X,
    ) -> Statement<P, X> {
        Statement {
            spec: Arc::new(StatementSpec::new(statement_id, class)),
            catalog: Arc::clone(&self.catalog),
            retry: Arc::clone(&self.retry),
            parser,
            _params: PhantomData,
        }
    }

    pub fn insert<P>(&self, statement_id: impl Into<String>) -> Statement<P, AffectedRows> {
        self.define(statement_id, StatementClass::Mutation, AffectedRows)
    }

    pub fn update<P>(&self, statement_id: impl Into<String>) -> Statement<P, AffectedRows> {
        self.define(statement_id, StatementClass::Mutation, AffectedRows)
    }

    pub fn delete<P>(&self, statement_id: impl Into<String>) -> Statement<P, AffectedRows> {
        self.define(statement_id, StatementClass::Mutation, AffectedRows)
    }

    pub fn create_table<P>(&self, statement_id: impl Into<String>) -> Statement<P, AffectedRows> {
        self.define(statement_id, StatementClass::Mutation, AffectedRows)
    }

    pub fn drop_table<P>(&self, statement_id: impl Into<String>) -> Statement<P, AffectedRows> {
        self.define(statement_id, StatementClass::Mutation, AffectedRows)
    }

    /// Query whose first row, if any, is mapped onto `R`.
    pub fn select_one<P, R: Entity>(
        &self,
        statement_id: impl Into<String>,
    ) -> Statement<P, SingleRecord<R>> {
        self.define(statement_id, StatementClass::Query, SingleRecord::new())
    }

    /// Query whose rows are all mapped onto `R`.
    pub fn select_list<P, R: Entity>(
        &self,
        statement_id: impl Into<String>,
    ) -> Statement<P, RecordList<R>> {
        self.define(statement_id, StatementClass::Query, RecordList::new())
    }

    /// Query returning unmapped rows.
    pub fn select_rows<P>(&self, statement_id: impl Into<String>) -> Statement<P, RawRows> {
        self.define(statement_id, StatementClass::Query, RawRows)
    }
}

/// A declared statement taking parameters of type `P` and producing `X::Output`.
pub struct Statement<P, X> {
    spec: Arc<StatementSpec>,
    catalog: Arc<dyn StatementCatalog>,
    retry: Arc<RetryPolicy>,
    parser: X,
    _params: PhantomData<fn(&P)>,
}

impl<P, X: Clone> Clone for Statement<P, X> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            catalog: Arc::clone(&self.catalog),
            retry: Arc::clone(&self.retry),
            parser: self.parser.clone(),
            _params: PhantomData,
        }
    }
}

impl<P, X> fmt::Debug for Statement<P, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("statement_id", &self.spec.statement_id)
            .field("class", &self.spec.class)
            .finish()
    }
}

impl<P, X> Statement<P, X> {
    pub fn statement_id(&self) -> &str {
        &self.spec.statement_id
    }

    pub fn class(&self) -> StatementClass {
        self.spec.class
    }

    pub fn spec(&self) -> &StatementSpec {
        &self.spec
    }

    /// Current SQL text from the catalog.
    pub fn sql(&self) -> Option<String> {
        self.catalog.lookup(&self.spec.statement_id)
    }
}

impl<P: ToParameters, X: ResultParser> Statement<P, X> {
    /// Execute with parameters built from `params`.
    pub async fn execute<D: Driver>(
        &self,
        ctx: &mut ExecutionContext<D>,
        params: &P,
    ) -> DbResult<X::Output> {
        execute_with_retry(
            ctx,
            &self.spec,
            self.catalog.as_ref(),
            &self.retry,
            Some(params),
            &self.parser,
        )
        .await
    }

    /// Execute without binding any parameter.
    pub async fn execute_without_params<D: Driver>(
        &self,
        ctx: &mut ExecutionContext<D>,
    ) -> DbResult<X::Output> {
        execute_with_retry::<D, P, X>(
            ctx,
            &self.spec,
            self.catalog.as_ref(),
            &self.retry,
            None,
            &self.parser,
        )
        .await
    }
}
