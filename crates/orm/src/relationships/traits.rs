//! Relationship Traits - Core traits for relationship management

use crate::backends::DatabaseConnection;
use crate::error::ModelResult;
use crate::model::{Model, RelationOutput};
use crate::query::QueryBuilder;

/// Relationship metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMeta {
    /// Column holding the reference (on the related table, or on the child for BelongsTo)
    pub foreign_key: String,
    /// Column the reference points at
    pub local_key: String,
    pub related_table: String,
}

/// A relation from parent model `P` to its related model
///
/// A relation is built from one parent and carries a query already narrowed
/// to that parent. Eager loading reuses the same relation as a template for
/// a whole batch of parents, swapping the single-parent constraint for one
/// `IN` over every parent key.
#[allow(async_fn_in_trait)]
pub trait Relation<P: Model> {
    type Related: Model;

    /// `Option<Related>` for to-one relations, `Vec<Related>` for to-many
    type Output: RelationOutput<Item = Self::Related>;

    fn meta(&self) -> &RelationshipMeta;

    /// The constrained query for the parent this relation was built from
    fn query(&self) -> &QueryBuilder<Self::Related>;

    /// Resolve the relation for its parent
    async fn get_results(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Self::Output>;

    /// Resolve the relation for every parent with one query and cache it under `name`
    async fn eager_load(self, conn: &mut dyn DatabaseConnection, parents: &mut [P], name: &str) -> ModelResult<()>;
}
