//! Query Builder DML operations (INSERT, UPDATE, DELETE)

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::{DatabaseConnection, Row};
use crate::error::{ModelError, ModelResult};

impl<M> QueryBuilder<M> {
    /// Insert one row; an empty row issues no statement and returns `false`
    pub async fn insert(&self, conn: &mut dyn DatabaseConnection, row: Row) -> ModelResult<bool> {
        if row.is_empty() {
            return Ok(false);
        }

        let (sql, bindings) = self.build_insert_sql(std::slice::from_ref(&row))?;
        let result = conn.execute(&sql, &bindings).await?;
        Ok(result.rows_affected > 0)
    }

    /// Insert several rows in one statement using the first row's columns
    pub async fn insert_many(&self, conn: &mut dyn DatabaseConnection, rows: &[Row]) -> ModelResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let (sql, bindings) = self.build_insert_sql(rows)?;
        Ok(conn.execute(&sql, &bindings).await?.rows_affected)
    }

    /// Insert one row and return the generated id; an empty row inserts `DEFAULT VALUES`
    pub async fn insert_get_id(&self, conn: &mut dyn DatabaseConnection, row: Row) -> ModelResult<i64> {
        let (sql, bindings) = self.build_insert_sql(std::slice::from_ref(&row))?;
        let result = conn.execute(&sql, &bindings).await?;

        result
            .last_insert_id
            .ok_or_else(|| ModelError::Query(format!("Insert into {} reported no generated id", self.table)))
    }

    /// Update matching rows; an empty value set issues no statement
    pub async fn update(&self, conn: &mut dyn DatabaseConnection, values: Row) -> ModelResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }

        let set_clauses: Vec<SetClause> = values
            .into_iter()
            .map(|(column, value)| SetClause {
                column,
                value: SetValue::Bind(value),
            })
            .collect();

        self.execute_update(conn, &set_clauses).await
    }

    /// Delete matching rows
    pub async fn delete(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<u64> {
        let (sql, bindings) = self.build_delete_sql();
        Ok(conn.execute(&sql, &bindings).await?.rows_affected)
    }

    /// Add `amount` to a column on every matching row
    pub async fn increment(&self, conn: &mut dyn DatabaseConnection, column: &str, amount: i64) -> ModelResult<u64> {
        self.increment_with(conn, column, amount, Row::new()).await
    }

    /// Subtract `amount` from a column on every matching row
    pub async fn decrement(&self, conn: &mut dyn DatabaseConnection, column: &str, amount: i64) -> ModelResult<u64> {
        self.decrement_with(conn, column, amount, Row::new()).await
    }

    /// Increment a column and update extra columns in the same statement
    pub async fn increment_with(
        &self,
        conn: &mut dyn DatabaseConnection,
        column: &str,
        amount: i64,
        extra: Row,
    ) -> ModelResult<u64> {
        self.execute_update(conn, &step_clauses(column, "+", amount, extra)).await
    }

    /// Decrement a column and update extra columns in the same statement
    pub async fn decrement_with(
        &self,
        conn: &mut dyn DatabaseConnection,
        column: &str,
        amount: i64,
        extra: Row,
    ) -> ModelResult<u64> {
        self.execute_update(conn, &step_clauses(column, "-", amount, extra)).await
    }

    async fn execute_update(&self, conn: &mut dyn DatabaseConnection, set_clauses: &[SetClause]) -> ModelResult<u64> {
        let (sql, bindings) = self.build_update_sql(set_clauses);
        Ok(conn.execute(&sql, &bindings).await?.rows_affected)
    }
}

// The amount is an integer rendered by the engine, so it is written inline
fn step_clauses(column: &str, sign: &str, amount: i64, extra: Row) -> Vec<SetClause> {
    let mut clauses = vec![SetClause {
        column: column.to_string(),
        value: SetValue::Raw(format!("{} {} {}", column, sign, amount)),
    }];

    clauses.extend(extra.into_iter().map(|(column, value): (String, Value)| SetClause {
        column,
        value: SetValue::Bind(value),
    }));
    clauses
}
