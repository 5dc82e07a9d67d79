//! Query Builder Module - fluent query builder with ordered parameter binding
//!
//! Clause methods live in one file per concern; rendering is in
//! `sql_generation`, and statements run through `execution` and `dml`.

pub mod builder;
pub mod dml;
pub mod execution;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

// Re-export main types and builder
pub use builder::QueryBuilder;
pub use pagination::{PageInfo, Paginator};
pub use types::{
    JoinClause, JoinType, OrderDirection, Predicate, QueryOperator, SetClause, SetValue, WhereBoolean, WhereCondition,
};
