//! HasOne Relationship - parent model has one related model

use serde_json::Value;

use crate::backends::{DatabaseConnection, Row};
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

use super::has_many::HasMany;
use super::traits::{Relation, RelationshipMeta};

/// HasOne relationship - the to-one form of [`HasMany`]
#[derive(Debug)]
pub struct HasOne<R: Model> {
    inner: HasMany<R>,
}

impl<R: Model> HasOne<R> {
    /// Create a new HasOne relationship narrowed to `parent`
    pub fn new<P: Model>(parent: &P, foreign_key: &str, local_key: &str) -> Self {
        Self {
            inner: HasMany::new(parent, foreign_key, local_key),
        }
    }

    pub fn parent_key(&self) -> &Value {
        self.inner.parent_key()
    }

    /// The related model, if any
    pub async fn get(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        self.inner.first(conn).await
    }

    /// Create and persist the related model pointing at the parent
    pub async fn create(&self, conn: &mut dyn DatabaseConnection, attributes: Row) -> ModelResult<R> {
        self.inner.create(conn, attributes).await
    }

    /// Point `model` at the parent and save it
    pub async fn save(&self, conn: &mut dyn DatabaseConnection, model: &mut R) -> ModelResult<bool> {
        self.inner.save(conn, model).await
    }

    pub async fn update(&self, conn: &mut dyn DatabaseConnection, values: Row) -> ModelResult<u64> {
        self.inner.update(conn, values).await
    }

    pub async fn delete(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<u64> {
        self.inner.delete(conn).await
    }

    forward_query_constraints!(inner.query);
}

impl<P: Model, R: Model> Relation<P> for HasOne<R> {
    type Related = R;
    type Output = Option<R>;

    fn meta(&self) -> &RelationshipMeta {
        <HasMany<R> as Relation<P>>::meta(&self.inner)
    }

    fn query(&self) -> &QueryBuilder<R> {
        &self.inner.query
    }

    async fn get_results(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        self.get(conn).await
    }

    async fn eager_load(self, conn: &mut dyn DatabaseConnection, parents: &mut [P], name: &str) -> ModelResult<()> {
        self.inner.eager_load_into::<P, Option<R>>(conn, parents, name).await
    }
}
