//! Transaction Management
//!
//! A [`Transaction`] borrows a connection for its whole lifetime and is
//! itself a [`DatabaseConnection`], so every query builder and model
//! operation runs inside it unchanged. `commit` and `rollback` consume the
//! guard. Dropping an unfinished guard leaves the transaction open on the
//! connection; the caller owns the rollback.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backends::{DatabaseConnection, ExecuteResult, Row};
use crate::error::{ModelError, ModelResult};

/// SQLite transaction locking modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Locks are taken on first read or write
    #[default]
    Deferred,
    /// The write lock is taken immediately
    Immediate,
    /// No other connection may read or write until the transaction ends
    Exclusive,
}

impl TransactionMode {
    /// SQL statement opening a transaction in this mode
    pub fn as_sql(&self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN DEFERRED",
            TransactionMode::Immediate => "BEGIN IMMEDIATE",
            TransactionMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// An open transaction on a borrowed connection
pub struct Transaction<'c> {
    conn: &'c mut dyn DatabaseConnection,
    mode: TransactionMode,
    finished: bool,
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("mode", &self.mode)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<'c> Transaction<'c> {
    /// Begin a deferred transaction
    pub async fn begin(conn: &'c mut dyn DatabaseConnection) -> ModelResult<Transaction<'c>> {
        debug!("Beginning transaction");
        conn.begin_transaction().await?;

        Ok(Transaction {
            conn,
            mode: TransactionMode::Deferred,
            finished: false,
        })
    }

    /// Begin a transaction with an explicit locking mode
    pub async fn begin_with(conn: &'c mut dyn DatabaseConnection, mode: TransactionMode) -> ModelResult<Transaction<'c>> {
        debug!("Beginning transaction with mode: {:?}", mode);
        conn.execute(mode.as_sql(), &[]).await?;

        Ok(Transaction {
            conn,
            mode,
            finished: false,
        })
    }

    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> ModelResult<()> {
        // A failed COMMIT leaves the transaction open; the guard drops unfinished
        self.conn.commit().await?;
        self.finished = true;
        debug!("Transaction committed");
        Ok(())
    }

    /// Roll back the transaction
    pub async fn rollback(mut self) -> ModelResult<()> {
        self.conn.rollback().await?;
        self.finished = true;
        debug!("Transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl DatabaseConnection for Transaction<'_> {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> ModelResult<ExecuteResult> {
        self.conn.execute(sql, params).await
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> ModelResult<Vec<Row>> {
        self.conn.fetch_all(sql, params).await
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[Value]) -> ModelResult<Option<Row>> {
        self.conn.fetch_optional(sql, params).await
    }

    async fn begin_transaction(&mut self) -> ModelResult<()> {
        Err(ModelError::Transaction("A transaction is already open on this connection".to_string()))
    }

    async fn commit(&mut self) -> ModelResult<()> {
        Err(ModelError::Transaction("Commit a transaction by consuming its guard".to_string()))
    }

    async fn rollback(&mut self) -> ModelResult<()> {
        Err(ModelError::Transaction("Roll back a transaction by consuming its guard".to_string()))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Transaction dropped without commit or rollback; it stays open on the connection");
        }
    }
}
