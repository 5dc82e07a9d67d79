//! Query Builder ORDER BY, GROUP BY, HAVING operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

const CREATED_AT: &str = "created_at";

impl<M> QueryBuilder<M> {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Asc)
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by_direction(column, OrderDirection::Desc)
    }

    /// Add ORDER BY clause with an explicit direction
    pub fn order_by_direction(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    /// Newest first by `created_at`
    pub fn latest(self) -> Self {
        self.latest_by(CREATED_AT)
    }

    /// Newest first by the given timestamp column
    pub fn latest_by(self, column: &str) -> Self {
        self.order_by_desc(column)
    }

    /// Oldest first by `created_at`
    pub fn oldest(self) -> Self {
        self.oldest_by(CREATED_AT)
    }

    /// Oldest first by the given timestamp column
    pub fn oldest_by(self, column: &str) -> Self {
        self.order_by(column)
    }

    /// Add GROUP BY columns; accepts a comma-separated list
    pub fn group_by(mut self, columns: &str) -> Self {
        self.group_by.extend(
            columns
                .split(',')
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string()),
        );
        self
    }

    /// Add HAVING clause; its binding follows every WHERE binding
    pub fn having<T: Into<Value>>(mut self, column: &str, operator: &str, value: T) -> Self {
        let operator = operator.parse().unwrap_or_else(|err| {
            tracing::warn!("{} in having clause, falling back to '='", err);
            QueryOperator::Equal
        });

        self.having_conditions.push(WhereCondition {
            boolean: WhereBoolean::And,
            predicate: Predicate::Basic {
                column: column.to_string(),
                operator,
                value: value.into(),
            },
        });
        self
    }

    /// Add HAVING clause with equality
    pub fn having_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.having(column, "=", value)
    }
}
