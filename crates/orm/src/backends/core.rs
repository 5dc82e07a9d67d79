//! Core Database Backend Traits
//!
//! The ORM talks to storage only through [`DatabaseConnection`]: run a
//! parameterized statement, or fetch the rows it produces. Statements use `?`
//! positional placeholders exclusively and values are always bound, never
//! interpolated into the SQL text.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::OrmResult;

/// A fetched row: column name to value, in select-list order
pub type Row = Map<String, Value>;

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Row id generated by the last insert, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// Abstract database connection trait
///
/// A connection is used by one unit of work at a time; every call completes
/// before the next one is issued.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Execute a statement and report affected rows and the last inserted id
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecuteResult>;

    /// Execute a query and return every result row
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Execute a query and return the first result row
    async fn fetch_optional(&mut self, sql: &str, params: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Begin a transaction
    async fn begin_transaction(&mut self) -> OrmResult<()> {
        self.execute("BEGIN", &[]).await.map(|_| ())
    }

    /// Commit the current transaction
    async fn commit(&mut self) -> OrmResult<()> {
        self.execute("COMMIT", &[]).await.map(|_| ())
    }

    /// Roll back the current transaction
    async fn rollback(&mut self) -> OrmResult<()> {
        self.execute("ROLLBACK", &[]).await.map(|_| ())
    }
}
