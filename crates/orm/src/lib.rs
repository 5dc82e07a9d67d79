//! # quarry-orm: active-record data mapping
//!
//! A fluent query builder whose bindings always line up with its
//! placeholders, an active-record `Model` trait with mass-assignment
//! guarding, dirty tracking and casts, and relations (has-one, has-many,
//! belongs-to, belongs-to-many) with batch eager loading and pivot
//! management.
//!
//! Every terminal operation takes the connection explicitly:
//!
//! ```no_run
//! use quarry_orm::{DatabaseConnection, QueryBuilder, SqliteConnection};
//!
//! # async fn demo() -> quarry_orm::ModelResult<()> {
//! let mut conn = SqliteConnection::in_memory().await?;
//! conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[]).await?;
//!
//! let adults = QueryBuilder::<()>::table("users")
//!     .where_gte("age", 18)
//!     .order_by("name")
//!     .get_rows(&mut conn)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod query;
pub mod relationships;
pub mod transaction;

// Re-export core traits and types
pub use backends::{DatabaseConnection, ExecuteResult, Row, SqliteConnection};
pub use config::{ConfigError, DatabaseConfig};
pub use error::*;
pub use model::{CastKind, CrudOperations, Model, QueryMethods, Record, RelationOutput};
pub use query::{OrderDirection, PageInfo, Paginator, QueryBuilder, QueryOperator};
pub use relationships::{
    BelongsTo, BelongsToMany, HasMany, HasOne, HasRelationships, Relation, RelationshipMeta, SyncChanges,
    ToggleChanges,
};
pub use transaction::{Transaction, TransactionMode};
