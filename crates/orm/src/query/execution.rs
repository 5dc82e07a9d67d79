//! Query Builder execution
//!
//! Untyped terminals (raw rows, plucks, aggregates) work for every builder;
//! hydrating terminals need the builder's type parameter to be a [`Model`].

use serde_json::Value;

use super::builder::QueryBuilder;
use super::pagination::{PageInfo, Paginator};
use crate::backends::{DatabaseConnection, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::Model;

const AGGREGATE_ALIAS: &str = "aggregate";

impl<M> QueryBuilder<M> {
    /// Execute query and return raw rows
    pub async fn get_rows(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<Row>> {
        let (sql, bindings) = self.to_sql_with_bindings();
        conn.fetch_all(&sql, &bindings).await
    }

    /// Execute query with LIMIT 1 and return the first raw row
    pub async fn first_row(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<Row>> {
        let (sql, bindings) = self.clone().limit(1).to_sql_with_bindings();
        conn.fetch_optional(&sql, &bindings).await
    }

    /// Values of a single column, in result order
    pub async fn pluck(&self, conn: &mut dyn DatabaseConnection, column: &str) -> ModelResult<Vec<Value>> {
        let rows = self.clone().select(column).get_rows(conn).await?;
        let key = column.rsplit('.').next().unwrap_or(column);

        Ok(rows
            .into_iter()
            .map(|mut row| row.remove(key).unwrap_or(Value::Null))
            .collect())
    }

    /// Run an aggregate expression on a copy of this query and return its raw value
    async fn aggregate(&self, conn: &mut dyn DatabaseConnection, expression: &str) -> ModelResult<Value> {
        let mut query = self.clone();
        query.select_fields = vec![format!("{} AS {}", expression, AGGREGATE_ALIAS)];
        query.order_by.clear();

        let row = conn
            .fetch_optional(&query.to_sql(), &query.bindings())
            .await?;

        Ok(row
            .and_then(|mut row| row.remove(AGGREGATE_ALIAS))
            .unwrap_or(Value::Null))
    }

    /// Count matching rows
    pub async fn count(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<i64> {
        let value = self.aggregate(conn, "COUNT(*)").await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    /// Sum of a column; 0.0 when nothing matches
    pub async fn sum(&self, conn: &mut dyn DatabaseConnection, column: &str) -> ModelResult<f64> {
        let value = self.aggregate(conn, &format!("SUM({})", column)).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    /// Average of a column; 0.0 when nothing matches
    pub async fn avg(&self, conn: &mut dyn DatabaseConnection, column: &str) -> ModelResult<f64> {
        let value = self.aggregate(conn, &format!("AVG({})", column)).await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    /// Largest value of a column; `Null` when nothing matches
    pub async fn max(&self, conn: &mut dyn DatabaseConnection, column: &str) -> ModelResult<Value> {
        self.aggregate(conn, &format!("MAX({})", column)).await
    }

    /// Smallest value of a column; `Null` when nothing matches
    pub async fn min(&self, conn: &mut dyn DatabaseConnection, column: &str) -> ModelResult<Value> {
        self.aggregate(conn, &format!("MIN({})", column)).await
    }

    /// Whether any row matches
    pub async fn exists(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<bool> {
        Ok(self.count(conn).await? > 0)
    }

    /// Total row count ignoring ordering, limit and offset
    pub async fn count_for_pagination(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<u64> {
        let (sql, bindings) = self.build_count_sql();
        let row = conn.fetch_optional(&sql, &bindings).await?;
        let total = row
            .and_then(|row| row.get(AGGREGATE_ALIAS).and_then(Value::as_i64))
            .unwrap_or(0);
        Ok(total.max(0) as u64)
    }

    /// Paginate without hydrating: a count query, then one page of raw rows
    pub async fn paginate_rows(
        &self,
        conn: &mut dyn DatabaseConnection,
        page: u64,
        per_page: u64,
    ) -> ModelResult<Paginator<Row>> {
        let total = self.count_for_pagination(conn).await?;
        let info = PageInfo::new(total, page, per_page);

        let data = self
            .clone()
            .for_page(info.current_page, info.per_page)
            .get_rows(conn)
            .await?;

        Ok(Paginator { data, info })
    }
}

// Hydrating terminals for Model-typed query builders
impl<M: Model> QueryBuilder<M> {
    /// Execute query and return models
    pub async fn get(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<M>> {
        let rows = self.get_rows(conn).await?;
        Ok(rows.into_iter().map(M::new_from_row).collect())
    }

    /// Execute query and return first model
    pub async fn first(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<M>> {
        Ok(self.first_row(conn).await?.map(M::new_from_row))
    }

    /// Execute query and return first model or error
    pub async fn first_or_fail(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<M> {
        self.first(conn)
            .await?
            .ok_or_else(|| ModelError::not_found(M::model_name(), "matching query"))
    }

    /// Find a model by its primary key
    pub async fn find<T: Into<Value>>(&self, conn: &mut dyn DatabaseConnection, id: T) -> ModelResult<Option<M>> {
        self.find_by(conn, M::primary_key_name(), id).await
    }

    /// Find the first model whose column equals the given value
    pub async fn find_by<T: Into<Value>>(
        &self,
        conn: &mut dyn DatabaseConnection,
        column: &str,
        value: T,
    ) -> ModelResult<Option<M>> {
        self.clone().where_eq(column, value).first(conn).await
    }

    /// Execute query in pages of `chunk_size`, handing each page to the callback
    pub async fn chunk<F>(&self, conn: &mut dyn DatabaseConnection, chunk_size: i64, mut callback: F) -> ModelResult<()>
    where
        F: FnMut(Vec<M>) -> ModelResult<()>,
    {
        if chunk_size < 1 {
            return Err(ModelError::Query(format!("Chunk size must be positive, got {}", chunk_size)));
        }

        let mut offset = 0;
        loop {
            let chunk = self.clone().limit(chunk_size).offset(offset).get(conn).await?;

            if chunk.is_empty() {
                break;
            }

            callback(chunk)?;
            offset += chunk_size;
        }

        Ok(())
    }

    /// Paginate into hydrated models
    pub async fn paginate(&self, conn: &mut dyn DatabaseConnection, page: u64, per_page: u64) -> ModelResult<Paginator<M>> {
        Ok(self.paginate_rows(conn, page, per_page).await?.map(M::new_from_row))
    }
}
