//! CRUD Operations - Create, Read, Update, Delete operations for models
//!
//! Every statement goes through a [`QueryBuilder`] scoped to the model's
//! table, so values are always bound and never interpolated.

use serde_json::Value;
use tracing::debug;

use crate::backends::{DatabaseConnection, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::casts::fresh_timestamp;
use crate::model::core_trait::Model;
use crate::query::QueryBuilder;

fn table_query<M: Model>() -> QueryBuilder<M> {
    QueryBuilder::table(&M::table_name())
}

// Match attributes narrowed with one equality per column
fn matching_query<M: Model>(attributes: &Row) -> QueryBuilder<M> {
    attributes
        .iter()
        .fold(table_query::<M>(), |query, (column, value)| query.where_eq(column, value.clone()))
}

fn merge(mut base: Row, overrides: Row) -> Row {
    base.extend(overrides);
    base
}

/// Insert a model that does not exist yet
///
/// The row carries the fillable attributes, the primary key, the timestamp
/// columns and any `extra_columns` a relation assigned. Other attributes
/// stay in memory only.
pub(crate) async fn insert_model<M: Model>(
    model: &mut M,
    conn: &mut dyn DatabaseConnection,
    extra_columns: &[&str],
) -> ModelResult<bool> {
    let primary_key = M::primary_key_name();

    if M::uses_timestamps() {
        let now = fresh_timestamp();
        for column in [M::CREATED_AT, M::UPDATED_AT] {
            if model.get_raw(column).is_none() {
                model.set(column, now.clone());
            }
        }
    }

    let attributes: Row = model
        .record()
        .attributes
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            M::is_fillable(key)
                || key == primary_key
                || key == M::CREATED_AT
                || key == M::UPDATED_AT
                || extra_columns.contains(&key)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let id = table_query::<M>().insert_get_id(conn, attributes).await?;

    if M::incrementing() {
        model.set(primary_key, id);
    }

    model.record_mut().exists = true;
    model.sync_original();
    debug!("Inserted {} {}", M::model_name(), model.key());
    Ok(true)
}

/// Trait providing CRUD operations for models
#[allow(async_fn_in_trait)]
pub trait CrudOperations: Model {
    /// Find a model by its primary key
    async fn find<T: Into<Value>>(conn: &mut dyn DatabaseConnection, id: T) -> ModelResult<Option<Self>> {
        table_query::<Self>().find(conn, id).await
    }

    /// Find a model by its primary key or return an error if not found
    async fn find_or_fail<T: Into<Value>>(conn: &mut dyn DatabaseConnection, id: T) -> ModelResult<Self> {
        let id = id.into();
        Self::find(conn, id.clone())
            .await?
            .ok_or_else(|| ModelError::not_found(Self::model_name(), &id))
    }

    /// Every row of the table
    async fn all(conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<Self>> {
        table_query::<Self>().get(conn).await
    }

    /// Fill a new model with `attributes` and save it
    async fn create(conn: &mut dyn DatabaseConnection, attributes: Row) -> ModelResult<Self> {
        let mut model = Self::make(attributes);
        model.save(conn).await?;
        Ok(model)
    }

    /// Insert a new record or write the dirty attributes of an existing one
    ///
    /// Returns `Ok(true)` without a statement when nothing is dirty.
    async fn save(&mut self, conn: &mut dyn DatabaseConnection) -> ModelResult<bool> {
        let primary_key = Self::primary_key_name();

        if !self.exists() {
            return insert_model(self, conn, &[]).await;
        }

        let mut dirty = self.dirty();
        if dirty.is_empty() {
            return Ok(true);
        }

        if Self::uses_timestamps() && !dirty.contains_key(Self::UPDATED_AT) {
            let now = fresh_timestamp();
            self.set(Self::UPDATED_AT, now.clone());
            dirty.insert(Self::UPDATED_AT.to_string(), now);
        }

        // Address the row by the key it was loaded with, even if the key itself changed
        let key = self
            .original()
            .get(primary_key)
            .cloned()
            .filter(|value| !value.is_null())
            .ok_or(ModelError::MissingPrimaryKey)?;

        let affected = table_query::<Self>()
            .where_eq(primary_key, key)
            .update(conn, dirty)
            .await?;

        if affected > 0 {
            self.sync_original();
        }
        Ok(affected > 0)
    }

    /// Delete this record; a record that was never saved is left alone
    async fn delete(&mut self, conn: &mut dyn DatabaseConnection) -> ModelResult<bool> {
        if !self.exists() {
            return Ok(false);
        }

        let key = self.key();
        if key.is_null() {
            return Err(ModelError::MissingPrimaryKey);
        }

        let affected = table_query::<Self>()
            .where_eq(Self::primary_key_name(), key)
            .delete(conn)
            .await?;

        if affected > 0 {
            self.record_mut().exists = false;
        }
        Ok(affected > 0)
    }

    /// Fill and save
    async fn update(&mut self, conn: &mut dyn DatabaseConnection, attributes: Row) -> ModelResult<bool> {
        self.fill(attributes);
        self.save(conn).await
    }

    /// Reload attributes from the database and clear the relation cache
    async fn refresh(&mut self, conn: &mut dyn DatabaseConnection) -> ModelResult<()> {
        if !self.exists() {
            return Ok(());
        }

        let key = self.key();
        if key.is_null() {
            return Err(ModelError::MissingPrimaryKey);
        }

        let row = table_query::<Self>()
            .where_eq(Self::primary_key_name(), key.clone())
            .first_row(conn)
            .await?
            .ok_or_else(|| ModelError::not_found(Self::model_name(), &key))?;

        let record = self.record_mut();
        record.attributes = row;
        record.relations.clear();
        self.sync_original();
        Ok(())
    }

    /// Delete rows by primary key; returns the number removed
    async fn destroy<T: Into<Value>>(conn: &mut dyn DatabaseConnection, ids: Vec<T>) -> ModelResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        table_query::<Self>()
            .where_in(Self::primary_key_name(), ids)
            .delete(conn)
            .await
    }

    /// Update the first match with `values`, or create it from both maps
    async fn update_or_create(
        conn: &mut dyn DatabaseConnection,
        attributes: Row,
        values: Row,
    ) -> ModelResult<Self> {
        match matching_query::<Self>(&attributes).first(conn).await? {
            Some(mut model) => {
                model.fill(values);
                model.save(conn).await?;
                Ok(model)
            }
            None => Self::create(conn, merge(attributes, values)).await,
        }
    }

    /// The first match, or a newly created model from both maps
    async fn first_or_create(
        conn: &mut dyn DatabaseConnection,
        attributes: Row,
        values: Row,
    ) -> ModelResult<Self> {
        match matching_query::<Self>(&attributes).first(conn).await? {
            Some(model) => Ok(model),
            None => Self::create(conn, merge(attributes, values)).await,
        }
    }

    /// The first match, or an unsaved model filled from both maps
    async fn first_or_new(
        conn: &mut dyn DatabaseConnection,
        attributes: Row,
        values: Row,
    ) -> ModelResult<Self> {
        match matching_query::<Self>(&attributes).first(conn).await? {
            Some(model) => Ok(model),
            None => Ok(Self::make(merge(attributes, values))),
        }
    }
}

impl<T: Model> CrudOperations for T {}
