//! HasMany Relationship - parent model has many related models
//!
//! The related table holds the reference: `related.foreign_key = parent.local_key`.

use serde_json::Value;

use crate::backends::{DatabaseConnection, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::crud_operations::insert_model;
use crate::model::{CrudOperations, Model, Record, RelationOutput};
use crate::query::QueryBuilder;

use super::eager_loading::{build_dictionary, collect_keys, match_empty, match_to_parents, without_parent_constraint};
use super::traits::{Relation, RelationshipMeta};

/// HasMany relationship - parent model has many related models
#[derive(Debug)]
pub struct HasMany<R: Model> {
    pub(crate) query: QueryBuilder<R>,
    meta: RelationshipMeta,
    parent_key: Value,
    constraint_count: usize,
}

impl<R: Model> HasMany<R> {
    /// Create a new HasMany relationship narrowed to `parent`
    pub fn new<P: Model>(parent: &P, foreign_key: &str, local_key: &str) -> Self {
        let related_table = R::table_name();
        let parent_key = parent.get_raw(local_key).cloned().unwrap_or(Value::Null);
        let query = QueryBuilder::table(&related_table)
            .where_eq(&format!("{}.{}", related_table, foreign_key), parent_key.clone());

        Self {
            query,
            meta: RelationshipMeta {
                foreign_key: foreign_key.to_string(),
                local_key: local_key.to_string(),
                related_table,
            },
            parent_key,
            constraint_count: 1,
        }
    }

    pub fn parent_key(&self) -> &Value {
        &self.parent_key
    }

    pub fn foreign_key(&self) -> &str {
        &self.meta.foreign_key
    }

    /// Every related model; an unsaved parent has none and issues no query
    pub async fn get(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<R>> {
        if self.parent_key.is_null() {
            return Ok(Vec::new());
        }
        self.query.get(conn).await
    }

    /// First related model
    pub async fn first(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        if self.parent_key.is_null() {
            return Ok(None);
        }
        self.query.first(conn).await
    }

    pub async fn count(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<i64> {
        if self.parent_key.is_null() {
            return Ok(0);
        }
        self.query.count(conn).await
    }

    /// Create and persist a related model pointing at the parent
    pub async fn create(&self, conn: &mut dyn DatabaseConnection, attributes: Row) -> ModelResult<R> {
        let mut model = R::make(attributes);
        self.save(conn, &mut model).await?;
        Ok(model)
    }

    /// Create several related models, one insert each
    pub async fn create_many(&self, conn: &mut dyn DatabaseConnection, records: Vec<Row>) -> ModelResult<Vec<R>> {
        let mut models = Vec::with_capacity(records.len());
        for attributes in records {
            models.push(self.create(conn, attributes).await?);
        }
        Ok(models)
    }

    /// Point `model` at the parent and save it
    pub async fn save(&self, conn: &mut dyn DatabaseConnection, model: &mut R) -> ModelResult<bool> {
        self.ensure_parent_saved()?;
        model.set(&self.meta.foreign_key, self.parent_key.clone());
        if model.exists() {
            model.save(conn).await
        } else {
            insert_model(model, conn, &[self.meta.foreign_key.as_str()]).await
        }
    }

    /// Update every related row
    pub async fn update(&self, conn: &mut dyn DatabaseConnection, values: Row) -> ModelResult<u64> {
        self.ensure_parent_saved()?;
        self.query.update(conn, values).await
    }

    /// Delete every related row
    pub async fn delete(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<u64> {
        self.ensure_parent_saved()?;
        self.query.delete(conn).await
    }

    fn ensure_parent_saved(&self) -> ModelResult<()> {
        if self.parent_key.is_null() {
            return Err(ModelError::Relationship(format!(
                "Parent key {} is not set; save the parent before writing {} through it",
                self.meta.local_key, self.meta.related_table
            )));
        }
        Ok(())
    }

    pub(crate) async fn eager_load_into<P, O>(
        self,
        conn: &mut dyn DatabaseConnection,
        parents: &mut [P],
        name: &str,
    ) -> ModelResult<()>
    where
        P: Model,
        O: RelationOutput<Item = R>,
    {
        let keys = collect_keys(parents, &self.meta.local_key);
        if keys.is_empty() {
            match_empty::<P, O>(parents, name);
            return Ok(());
        }

        let foreign_key = format!("{}.{}", self.meta.related_table, self.meta.foreign_key);
        let rows = without_parent_constraint(self.query, self.constraint_count)
            .where_in(&foreign_key, keys)
            .get_rows(conn)
            .await?;

        let records: Vec<Record> = rows.into_iter().map(Record::from_row).collect();
        let dictionary = build_dictionary(records, |record| record.attributes().get(&self.meta.foreign_key).cloned());
        match_to_parents::<P, O>(parents, name, &self.meta.local_key, &dictionary);
        Ok(())
    }

    forward_query_constraints!(query);
}

impl<P: Model, R: Model> Relation<P> for HasMany<R> {
    type Related = R;
    type Output = Vec<R>;

    fn meta(&self) -> &RelationshipMeta {
        &self.meta
    }

    fn query(&self) -> &QueryBuilder<R> {
        &self.query
    }

    async fn get_results(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<R>> {
        self.get(conn).await
    }

    async fn eager_load(self, conn: &mut dyn DatabaseConnection, parents: &mut [P], name: &str) -> ModelResult<()> {
        self.eager_load_into::<P, Vec<R>>(conn, parents, name).await
    }
}
