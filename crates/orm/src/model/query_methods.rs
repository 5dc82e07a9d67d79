//! Query Methods - query entry points and batch loading for models

use serde_json::Value;

use crate::backends::DatabaseConnection;
use crate::error::ModelResult;
use crate::model::core_trait::Model;
use crate::query::{Paginator, QueryBuilder};
use crate::relationships::Relation;

/// Trait providing query operations for model collections
#[allow(async_fn_in_trait)]
pub trait QueryMethods: Model {
    /// Get a query builder for this model
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::table(&Self::table_name())
    }

    fn where_eq<T: Into<Value>>(column: &str, value: T) -> QueryBuilder<Self> {
        Self::query().where_eq(column, value)
    }

    fn where_condition<T: Into<Value>>(column: &str, operator: &str, value: T) -> QueryBuilder<Self> {
        Self::query().where_condition(column, operator, value)
    }

    fn where_in<T: Into<Value>>(column: &str, values: Vec<T>) -> QueryBuilder<Self> {
        Self::query().where_in(column, values)
    }

    /// Count all records for this model
    async fn count(conn: &mut dyn DatabaseConnection) -> ModelResult<i64> {
        Self::query().count(conn).await
    }

    /// One page of records ordered as stored
    async fn paginate(conn: &mut dyn DatabaseConnection, page: u64, per_page: u64) -> ModelResult<Paginator<Self>> {
        Self::query().paginate(conn, page, per_page).await
    }

    /// Load a relation for every model in `parents` with a single query
    ///
    /// `define` builds the relation from one parent; that relation's query,
    /// including any extra constraints, is reused for the whole batch.
    async fn eager_load<Rel, F>(
        conn: &mut dyn DatabaseConnection,
        parents: &mut [Self],
        name: &str,
        define: F,
    ) -> ModelResult<()>
    where
        Rel: Relation<Self>,
        F: FnOnce(&Self) -> Rel,
    {
        let Some(first) = parents.first() else {
            return Ok(());
        };

        let relation = define(first);
        relation.eager_load(conn, parents, name).await
    }
}

impl<T: Model> QueryMethods for T {}
