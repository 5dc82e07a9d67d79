//! BelongsTo Relationship - child model belongs to an owner model
//!
//! The child holds the reference: `owner.owner_key = child.foreign_key`.

use serde_json::Value;

use crate::backends::DatabaseConnection;
use crate::error::ModelResult;
use crate::model::{Model, Record};
use crate::query::QueryBuilder;

use super::eager_loading::{build_dictionary, collect_keys, match_empty, match_to_parents, without_parent_constraint};
use super::traits::{Relation, RelationshipMeta};

/// BelongsTo relationship - child model belongs to an owner model
#[derive(Debug)]
pub struct BelongsTo<R: Model> {
    pub(crate) query: QueryBuilder<R>,
    meta: RelationshipMeta,
    child_key: Value,
    constraint_count: usize,
}

impl<R: Model> BelongsTo<R> {
    /// Create a new BelongsTo relationship narrowed to `child`
    pub fn new<C: Model>(child: &C, foreign_key: &str, owner_key: &str) -> Self {
        let related_table = R::table_name();
        let child_key = child.get_raw(foreign_key).cloned().unwrap_or(Value::Null);
        let query = QueryBuilder::table(&related_table)
            .where_eq(&format!("{}.{}", related_table, owner_key), child_key.clone());

        Self {
            query,
            meta: RelationshipMeta {
                foreign_key: foreign_key.to_string(),
                local_key: owner_key.to_string(),
                related_table,
            },
            child_key,
            constraint_count: 1,
        }
    }

    pub fn foreign_key(&self) -> &str {
        &self.meta.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.meta.local_key
    }

    /// The owner, if the child references one
    pub async fn get(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        if self.child_key.is_null() {
            return Ok(None);
        }
        self.query.first(conn).await
    }

    /// Point `child` at `owner` and cache the owner under `name`; nothing is persisted
    pub fn associate<C: Model>(&self, child: &mut C, owner: &R, name: &str) {
        let owner_key = owner.get_raw(&self.meta.local_key).cloned().unwrap_or(Value::Null);
        child.set(&self.meta.foreign_key, owner_key);
        child.set_relation(name, &Some(R::from_record(owner.record().clone())));
    }

    /// Clear the reference on `child` and cache an empty owner under `name`; nothing is persisted
    pub fn dissociate<C: Model>(&self, child: &mut C, name: &str) {
        child.set(&self.meta.foreign_key, Value::Null);
        child.set_relation(name, &None::<R>);
    }

    forward_query_constraints!(query);
}

impl<C: Model, R: Model> Relation<C> for BelongsTo<R> {
    type Related = R;
    type Output = Option<R>;

    fn meta(&self) -> &RelationshipMeta {
        &self.meta
    }

    fn query(&self) -> &QueryBuilder<R> {
        &self.query
    }

    async fn get_results(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        self.get(conn).await
    }

    async fn eager_load(self, conn: &mut dyn DatabaseConnection, children: &mut [C], name: &str) -> ModelResult<()> {
        let keys = collect_keys(children, &self.meta.foreign_key);
        if keys.is_empty() {
            match_empty::<C, Option<R>>(children, name);
            return Ok(());
        }

        let owner_key = format!("{}.{}", self.meta.related_table, self.meta.local_key);
        let rows = without_parent_constraint(self.query, self.constraint_count)
            .where_in(&owner_key, keys)
            .get_rows(conn)
            .await?;

        let records: Vec<Record> = rows.into_iter().map(Record::from_row).collect();
        let dictionary = build_dictionary(records, |record| record.attributes().get(&self.meta.local_key).cloned());
        match_to_parents::<C, Option<R>>(children, name, &self.meta.foreign_key, &dictionary);
        Ok(())
    }
}
