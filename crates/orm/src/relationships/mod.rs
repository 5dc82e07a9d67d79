//! Relationships Module - relations between models with eager loading
//!
//! - `has_one` / `has_many`: the related table references the parent
//! - `belongs_to`: the model references its owner
//! - `belongs_to_many`: both sides linked through a pivot table
//! - `eager_loading`: dictionary matching for batch loads

// Forward the common query constraints of a relation to its inner builder
macro_rules! forward_query_constraints {
    ($($field:ident).+) => {
        /// Add WHERE condition with equality
        pub fn where_eq<T: Into<serde_json::Value>>(mut self, column: &str, value: T) -> Self {
            self.$($field).+ = self.$($field).+.where_eq(column, value);
            self
        }

        /// Add WHERE condition with custom operator
        pub fn where_condition<T: Into<serde_json::Value>>(mut self, column: &str, operator: &str, value: T) -> Self {
            self.$($field).+ = self.$($field).+.where_condition(column, operator, value);
            self
        }

        /// Add WHERE condition with IN
        pub fn where_in<T: Into<serde_json::Value>>(mut self, column: &str, values: Vec<T>) -> Self {
            self.$($field).+ = self.$($field).+.where_in(column, values);
            self
        }

        pub fn where_null(mut self, column: &str) -> Self {
            self.$($field).+ = self.$($field).+.where_null(column);
            self
        }

        pub fn where_not_null(mut self, column: &str) -> Self {
            self.$($field).+ = self.$($field).+.where_not_null(column);
            self
        }

        pub fn order_by(mut self, column: &str) -> Self {
            self.$($field).+ = self.$($field).+.order_by(column);
            self
        }

        pub fn order_by_desc(mut self, column: &str) -> Self {
            self.$($field).+ = self.$($field).+.order_by_desc(column);
            self
        }

        pub fn limit(mut self, count: i64) -> Self {
            self.$($field).+ = self.$($field).+.limit(count);
            self
        }

        /// Apply any builder calls to the relation query
        pub fn constrain<F>(mut self, constraint: F) -> Self
        where
            F: FnOnce(crate::query::QueryBuilder<R>) -> crate::query::QueryBuilder<R>,
        {
            self.$($field).+ = constraint(self.$($field).+);
            self
        }
    };
}

pub mod belongs_to;
pub mod belongs_to_many;
pub mod eager_loading;
pub mod has_many;
pub mod has_one;
pub mod has_relationships;
pub mod traits;

// Re-export main types
pub use belongs_to::BelongsTo;
pub use belongs_to_many::{BelongsToMany, SyncChanges, ToggleChanges};
pub use has_many::HasMany;
pub use has_one::HasOne;
pub use has_relationships::HasRelationships;
pub use traits::{Relation, RelationshipMeta};
