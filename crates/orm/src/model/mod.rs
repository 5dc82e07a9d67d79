//! Model System - Modular model trait system for database entities
//!
//! - `core_trait`: the `Model` trait with attribute state and relation cache
//! - `record`: attribute storage and cached relation values
//! - `casts`: read-time attribute casts
//! - `crud_operations`: Create, Read, Update, Delete operations
//! - `query_methods`: query entry points and eager loading

pub mod casts;
pub mod core_trait;
pub mod crud_operations;
pub mod query_methods;
pub mod record;

// Re-export main types and traits for convenience
pub use casts::{fresh_timestamp, CastKind};
pub use core_trait::Model;
pub use crud_operations::CrudOperations;
pub use query_methods::QueryMethods;
pub use record::{serialize_record, CachedRelation, Record, RelationOutput, RelationValue};
