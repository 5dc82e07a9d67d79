//! Query Builder WHERE clause operations
//!
//! Every method appends one predicate; the values it binds travel with it.

use serde_json::Value;
use tracing::warn;

use super::builder::QueryBuilder;
use super::types::*;

fn parse_operator(operator: &str) -> QueryOperator {
    operator.parse().unwrap_or_else(|err| {
        warn!("{}, falling back to '='", err);
        QueryOperator::Equal
    })
}

impl<M> QueryBuilder<M> {
    fn push_where(mut self, boolean: WhereBoolean, predicate: Predicate) -> Self {
        self.where_conditions.push(WhereCondition { boolean, predicate });
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::Equal, value)
    }

    /// Add OR WHERE condition with equality
    pub fn or_where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::Equal, value)
    }

    /// Add WHERE condition with a typed operator
    pub fn where_op<T: Into<Value>>(self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Basic {
                column: column.to_string(),
                operator,
                value: value.into(),
            },
        )
    }

    /// Add OR WHERE condition with a typed operator
    pub fn or_where_op<T: Into<Value>>(self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.push_where(
            WhereBoolean::Or,
            Predicate::Basic {
                column: column.to_string(),
                operator,
                value: value.into(),
            },
        )
    }

    /// Add WHERE condition with custom operator (`=`, `!=`, `<>`, `>`, `>=`, `<`, `<=`, `LIKE`, `NOT LIKE`)
    pub fn where_condition<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        self.where_op(column, parse_operator(operator), value)
    }

    /// Add OR WHERE condition with custom operator
    pub fn or_where_condition<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        self.or_where_op(column, parse_operator(operator), value)
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::NotEqual, value)
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThan, value)
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThanOrEqual, value)
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThan, value)
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThanOrEqual, value)
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, QueryOperator::Like, pattern)
    }

    /// Add WHERE condition with NOT LIKE
    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, QueryOperator::NotLike, pattern)
    }

    /// Add WHERE condition with IN; binds one value per element
    pub fn where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::In {
                column: column.to_string(),
                values: values.into_iter().map(Into::into).collect(),
                negated: false,
            },
        )
    }

    /// Add OR WHERE condition with IN
    pub fn or_where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            WhereBoolean::Or,
            Predicate::In {
                column: column.to_string(),
                values: values.into_iter().map(Into::into).collect(),
                negated: false,
            },
        )
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::In {
                column: column.to_string(),
                values: values.into_iter().map(Into::into).collect(),
                negated: true,
            },
        )
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    /// Add OR WHERE condition with IS NULL
    pub fn or_where_null(self, column: &str) -> Self {
        self.push_where(
            WhereBoolean::Or,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Null {
                column: column.to_string(),
                negated: true,
            },
        )
    }

    /// Add WHERE condition with BETWEEN; binds low then high
    pub fn where_between<T: Into<Value>>(self, column: &str, low: T, high: T) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Between {
                column: column.to_string(),
                low: low.into(),
                high: high.into(),
                negated: false,
            },
        )
    }

    /// Add WHERE condition with NOT BETWEEN
    pub fn where_not_between<T: Into<Value>>(self, column: &str, low: T, high: T) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Between {
                column: column.to_string(),
                low: low.into(),
                high: high.into(),
                negated: true,
            },
        )
    }

    /// Compare two columns; binds nothing
    pub fn where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Column {
                first: first.to_string(),
                operator: parse_operator(operator),
                second: second.to_string(),
            },
        )
    }

    /// Add raw WHERE condition; its bindings are appended verbatim, in order
    pub fn where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.push_where(
            WhereBoolean::And,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }

    /// Add raw OR WHERE condition
    pub fn or_where_raw(self, sql: &str, bindings: Vec<Value>) -> Self {
        self.push_where(
            WhereBoolean::Or,
            Predicate::Raw {
                sql: sql.to_string(),
                bindings,
            },
        )
    }
}
