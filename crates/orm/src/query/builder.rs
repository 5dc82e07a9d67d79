//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use super::types::*;

/// Query builder for constructing database queries
///
/// The type parameter is the model rows are hydrated into; `()` builds
/// untyped queries. Predicates carry their own bound values, so the bindings
/// handed to the connection are always produced in the same order the
/// placeholders are rendered.
#[derive(Debug)]
pub struct QueryBuilder<M = ()> {
    pub(crate) table: String,
    pub(crate) select_fields: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having_conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    _phantom: PhantomData<fn() -> M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            select_fields: self.select_fields.clone(),
            distinct: self.distinct,
            joins: self.joins.clone(),
            where_conditions: self.where_conditions.clone(),
            group_by: self.group_by.clone(),
            having_conditions: self.having_conditions.clone(),
            order_by: self.order_by.clone(),
            limit_count: self.limit_count,
            offset_value: self.offset_value,
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            table: String::new(),
            select_fields: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_conditions: Vec::new(),
            group_by: Vec::new(),
            having_conditions: Vec::new(),
            order_by: Vec::new(),
            limit_count: None,
            offset_value: None,
            _phantom: PhantomData,
        }
    }

    /// Create a query builder scoped to a table
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// The table this builder reads from and writes to
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Where conditions added so far, in order
    pub fn wheres(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    /// Re-type the builder for another model, keeping every clause
    pub fn cast<T>(self) -> QueryBuilder<T> {
        QueryBuilder {
            table: self.table,
            select_fields: self.select_fields,
            distinct: self.distinct,
            joins: self.joins,
            where_conditions: self.where_conditions,
            group_by: self.group_by,
            having_conditions: self.having_conditions,
            order_by: self.order_by,
            limit_count: self.limit_count,
            offset_value: self.offset_value,
            _phantom: PhantomData,
        }
    }
}
