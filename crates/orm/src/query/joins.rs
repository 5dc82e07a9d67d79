//! Query Builder JOIN operations

use tracing::warn;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    fn push_join(mut self, join_type: JoinType, table: &str, left: &str, operator: &str, right: &str) -> Self {
        let operator = operator.parse().unwrap_or_else(|err| {
            warn!("{} in join on {}, falling back to '='", err, table);
            QueryOperator::Equal
        });

        self.joins.push(JoinClause {
            join_type,
            table: table.to_string(),
            left: left.to_string(),
            operator,
            right: right.to_string(),
        });
        self
    }

    /// Add INNER JOIN to the query
    pub fn join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join(JoinType::Inner, table, left, operator, right)
    }

    /// Add LEFT JOIN to the query
    pub fn left_join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join(JoinType::Left, table, left, operator, right)
    }

    /// Add RIGHT JOIN to the query
    pub fn right_join(self, table: &str, left: &str, operator: &str, right: &str) -> Self {
        self.push_join(JoinType::Right, table, left, operator, right)
    }
}
