//! SQLite backend built on a single sqlx connection

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::core::{DatabaseConnection, ExecuteResult, Row};
use crate::config::DatabaseConfig;
use crate::error::OrmResult;

/// A [`DatabaseConnection`] backed by one SQLite connection
pub struct SqliteConnection {
    inner: sqlx::sqlite::SqliteConnection,
    log_statements: bool,
}

impl SqliteConnection {
    /// Open a connection using the given configuration
    pub async fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        config.validate()?;

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(config.foreign_keys)
            .busy_timeout(config.busy_timeout);

        let inner = options.connect().await?;
        debug!("SQLite connection opened for {}", config.url);

        Ok(Self {
            inner,
            log_statements: config.log_statements,
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> OrmResult<Self> {
        Self::connect(&DatabaseConfig::in_memory()).await
    }

    /// Close the connection
    pub async fn close(self) -> OrmResult<()> {
        self.inner.close().await?;
        Ok(())
    }

    fn log(&self, sql: &str, params: &[Value]) {
        if self.log_statements {
            info!(bindings = params.len(), "{}", sql);
        } else {
            debug!(bindings = params.len(), "{}", sql);
        }
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecuteResult> {
        self.log(sql, params);
        let result = bind_values(sqlx::query(sql), params)
            .execute(&mut self.inner)
            .await?;

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.log(sql, params);
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&mut self.inner)
            .await?;

        rows.iter().map(decode_row).collect()
    }
}

/// Bind JSON values positionally onto a sqlx query
fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => {
                    if n.is_u64() {
                        warn!("Integer {} exceeds the SQLite INTEGER range; binding it as REAL", n);
                    }
                    query.bind(n.as_f64().unwrap_or_default())
                }
            },
            Value::String(s) => query.bind(s.as_str()),
            // Arrays and objects are stored as JSON text
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Convert a SQLite row into an ordered column map using each value's storage class
fn decode_row(row: &SqliteRow) -> OrmResult<Row> {
    let mut map = Row::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => {
                    Value::from(row.try_get_unchecked::<i64, _>(index)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    let f = row.try_get_unchecked::<f64, _>(index)?;
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                    Value::String(decode_blob(column.name(), bytes))
                }
                _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
            }
        };

        map.insert(column.name().to_string(), value);
    }

    Ok(map)
}

// BLOB columns surface as text; invalid UTF-8 is replaced and reported
fn decode_blob(column: &str, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                column,
                "BLOB is not valid UTF-8 at byte {}; replacing invalid sequences",
                e.utf8_error().valid_up_to()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
