//! BelongsToMany Relationship - many-to-many through a pivot table
//!
//! Related rows are joined to the pivot on `related.related_key =
//! pivot.related_pivot_key` and narrowed with `pivot.foreign_pivot_key =
//! parent.local_key`. Pivot columns are selected as `pivot_<column>` and moved
//! into each hydrated model's pivot map.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::backends::{DatabaseConnection, Row};
use crate::error::{ModelError, ModelResult};
use crate::model::{fresh_timestamp, Model, Record};
use crate::query::QueryBuilder;

use super::eager_loading::{
    build_dictionary, collect_keys, key_string, match_empty, match_to_parents, without_parent_constraint,
};
use super::traits::{Relation, RelationshipMeta};

const PIVOT_PREFIX: &str = "pivot_";
const PIVOT_CREATED_AT: &str = "created_at";
const PIVOT_UPDATED_AT: &str = "updated_at";

/// Comparable form of a pivot value as SQLite stores it
///
/// Column affinity rewrites what was bound: `true` reads back as `1` and
/// `5.0` as `5` or `"5.0"`. Numbers and numeric text compare by value.
fn pivot_value_key(value: &Value) -> Option<String> {
    fn number_key(float: f64) -> String {
        if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
            (float as i64).to_string()
        } else {
            float.to_string()
        }
    }

    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(if *flag { "1" } else { "0" }.to_string()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(int), _) => Some(int.to_string()),
            (None, Some(float)) => Some(number_key(float)),
            _ => Some(n.to_string()),
        },
        Value::String(text) => match (text.trim().parse::<i64>(), text.trim().parse::<f64>()) {
            (Ok(int), _) => Some(int.to_string()),
            (Err(_), Ok(float)) if float.is_finite() => Some(number_key(float)),
            _ => Some(text.clone()),
        },
        other => Some(other.to_string()),
    }
}

/// Pivot changes made by a sync
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncChanges {
    pub attached: Vec<Value>,
    pub detached: Vec<Value>,
    pub updated: Vec<Value>,
}

/// Pivot changes made by a toggle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToggleChanges {
    pub attached: Vec<Value>,
    pub detached: Vec<Value>,
}

/// BelongsToMany relationship - parent and related models linked by pivot rows
#[derive(Debug)]
pub struct BelongsToMany<R: Model> {
    pub(crate) query: QueryBuilder<R>,
    meta: RelationshipMeta,
    pivot_table: String,
    related_pivot_key: String,
    related_key: String,
    parent_key: Value,
    pivot_columns: Vec<String>,
    pivot_timestamps: bool,
    constraint_count: usize,
}

impl<R: Model> BelongsToMany<R> {
    /// Create a new BelongsToMany relationship narrowed to `parent`
    pub fn new<P: Model>(
        parent: &P,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
        parent_key: &str,
        related_key: &str,
    ) -> Self {
        let related_table = R::table_name();
        let parent_key_value = parent.get_raw(parent_key).cloned().unwrap_or(Value::Null);

        let query = QueryBuilder::table(&related_table)
            .join(
                pivot_table,
                &format!("{}.{}", related_table, related_key),
                "=",
                &format!("{}.{}", pivot_table, related_pivot_key),
            )
            .where_eq(&format!("{}.{}", pivot_table, foreign_pivot_key), parent_key_value.clone());

        Self {
            query,
            meta: RelationshipMeta {
                foreign_key: foreign_pivot_key.to_string(),
                local_key: parent_key.to_string(),
                related_table,
            },
            pivot_table: pivot_table.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            related_key: related_key.to_string(),
            parent_key: parent_key_value,
            pivot_columns: Vec::new(),
            pivot_timestamps: false,
            constraint_count: 1,
        }
    }

    pub fn pivot_table(&self) -> &str {
        &self.pivot_table
    }

    pub fn foreign_pivot_key(&self) -> &str {
        &self.meta.foreign_key
    }

    pub fn related_pivot_key(&self) -> &str {
        &self.related_pivot_key
    }

    pub fn related_key(&self) -> &str {
        &self.related_key
    }

    pub fn parent_key(&self) -> &Value {
        &self.parent_key
    }

    /// Also select these pivot columns into each model's pivot map
    pub fn with_pivot(mut self, columns: &[&str]) -> Self {
        for column in columns {
            if !self.pivot_columns.iter().any(|c| c == column) {
                self.pivot_columns.push(column.to_string());
            }
        }
        self
    }

    /// Maintain `created_at`/`updated_at` on pivot rows and select them
    pub fn with_timestamps(mut self) -> Self {
        self.pivot_timestamps = true;
        self
    }

    fn pivot_column_names(&self) -> Vec<&str> {
        let mut names = vec![self.meta.foreign_key.as_str(), self.related_pivot_key.as_str()];
        names.extend(self.pivot_columns.iter().map(String::as_str));
        if self.pivot_timestamps {
            names.extend([PIVOT_CREATED_AT, PIVOT_UPDATED_AT]);
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(*name));
        names
    }

    /// The relation query with related columns and aliased pivot columns selected
    fn select_query(&self) -> QueryBuilder<R> {
        let mut query = self.query.clone();
        if query.selected().is_empty() {
            query = query.select(&format!("{}.*", self.meta.related_table));
        }

        for column in self.pivot_column_names() {
            query = query.select_raw(&format!(
                "{}.{} AS {}{}",
                self.pivot_table, column, PIVOT_PREFIX, column
            ));
        }
        query
    }

    /// Split the aliased pivot columns off each row
    fn hydrate(&self, rows: Vec<Row>) -> Vec<Record> {
        let columns = self.pivot_column_names();

        rows.into_iter()
            .map(|mut row| {
                let mut pivot = Row::new();
                for column in &columns {
                    let value = row
                        .remove(&format!("{}{}", PIVOT_PREFIX, column))
                        .unwrap_or(Value::Null);
                    pivot.insert(column.to_string(), value);
                }

                let mut record = Record::from_row(row);
                record.pivot = Some(pivot);
                record
            })
            .collect()
    }

    /// Every related model, each carrying its pivot row
    pub async fn get(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<R>> {
        if self.parent_key.is_null() {
            return Ok(Vec::new());
        }

        let rows = self.select_query().get_rows(conn).await?;
        Ok(self.hydrate(rows).into_iter().map(R::from_record).collect())
    }

    pub async fn first(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Option<R>> {
        if self.parent_key.is_null() {
            return Ok(None);
        }

        let rows = self.select_query().limit(1).get_rows(conn).await?;
        Ok(self.hydrate(rows).into_iter().next().map(R::from_record))
    }

    pub async fn count(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<i64> {
        if self.parent_key.is_null() {
            return Ok(0);
        }
        self.query.count(conn).await
    }

    /// Pivot rows belonging to the parent
    fn pivot_query(&self) -> QueryBuilder<()> {
        QueryBuilder::table(&self.pivot_table).where_eq(&self.meta.foreign_key, self.parent_key.clone())
    }

    /// Related ids currently linked to the parent, in pivot order
    pub async fn related_ids(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<Vec<Value>> {
        self.ensure_parent_saved()?;
        self.pivot_query().pluck(conn, &self.related_pivot_key).await
    }

    fn pivot_row(&self, id: Value, attributes: Row) -> Row {
        let mut row = Row::new();
        row.insert(self.meta.foreign_key.clone(), self.parent_key.clone());
        row.insert(self.related_pivot_key.clone(), id);
        row.extend(attributes);

        if self.pivot_timestamps {
            let now = fresh_timestamp();
            for column in [PIVOT_CREATED_AT, PIVOT_UPDATED_AT] {
                if !row.contains_key(column) {
                    row.insert(column.to_string(), now.clone());
                }
            }
        }
        row
    }

    /// Link related ids to the parent, one pivot insert per id
    pub async fn attach<T: Into<Value>>(&self, conn: &mut dyn DatabaseConnection, ids: Vec<T>) -> ModelResult<()> {
        let records = ids.into_iter().map(|id| (id.into(), Row::new())).collect();
        self.attach_with(conn, records).await
    }

    /// Link related ids with extra pivot attributes
    pub async fn attach_with(&self, conn: &mut dyn DatabaseConnection, records: Vec<(Value, Row)>) -> ModelResult<()> {
        self.ensure_parent_saved()?;
        let pivot = QueryBuilder::<()>::table(&self.pivot_table);

        for (id, attributes) in records {
            pivot.insert(conn, self.pivot_row(id, attributes)).await?;
        }
        Ok(())
    }

    /// Remove pivot rows: `None` removes every row for the parent, an empty list removes nothing
    pub async fn detach(&self, conn: &mut dyn DatabaseConnection, ids: Option<Vec<Value>>) -> ModelResult<u64> {
        self.ensure_parent_saved()?;

        match ids {
            Some(ids) if ids.is_empty() => Ok(0),
            Some(ids) => self.pivot_query().where_in(&self.related_pivot_key, ids).delete(conn).await,
            None => self.pivot_query().delete(conn).await,
        }
    }

    /// Remove every pivot row for the parent
    pub async fn detach_all(&self, conn: &mut dyn DatabaseConnection) -> ModelResult<u64> {
        self.detach(conn, None).await
    }

    /// Make the linked ids exactly `ids`
    pub async fn sync<T: Into<Value>>(&self, conn: &mut dyn DatabaseConnection, ids: Vec<T>) -> ModelResult<SyncChanges> {
        let records = ids.into_iter().map(|id| (id.into(), Row::new())).collect();
        self.sync_records(conn, records, true).await
    }

    /// Make the linked ids exactly the given ones, updating pivot attributes that differ
    pub async fn sync_with_attributes(
        &self,
        conn: &mut dyn DatabaseConnection,
        records: Vec<(Value, Row)>,
    ) -> ModelResult<SyncChanges> {
        self.sync_records(conn, records, true).await
    }

    /// Attach missing ids without detaching anything
    pub async fn sync_without_detaching<T: Into<Value>>(
        &self,
        conn: &mut dyn DatabaseConnection,
        ids: Vec<T>,
    ) -> ModelResult<SyncChanges> {
        let records = ids.into_iter().map(|id| (id.into(), Row::new())).collect();
        self.sync_records(conn, records, false).await
    }

    async fn sync_records(
        &self,
        conn: &mut dyn DatabaseConnection,
        records: Vec<(Value, Row)>,
        detaching: bool,
    ) -> ModelResult<SyncChanges> {
        self.ensure_parent_saved()?;
        let mut changes = SyncChanges::default();

        let current_rows = self.pivot_query().get_rows(conn).await?;
        let mut current: HashMap<String, Row> = HashMap::new();
        let mut current_ids = Vec::new();
        for row in current_rows {
            let id = row.get(&self.related_pivot_key).cloned().unwrap_or(Value::Null);
            if let Some(key) = key_string(&id) {
                if !current.contains_key(&key) {
                    current_ids.push((key.clone(), id));
                }
                current.insert(key, row);
            }
        }

        let mut seen = HashSet::new();
        let targets: Vec<(String, Value, Row)> = records
            .into_iter()
            .filter_map(|(id, attributes)| key_string(&id).map(|key| (key, id, attributes)))
            .filter(|(key, _, _)| seen.insert(key.clone()))
            .collect();

        if detaching {
            let detach: Vec<Value> = current_ids
                .into_iter()
                .filter(|(key, _)| !seen.contains(key))
                .map(|(_, id)| id)
                .collect();

            if !detach.is_empty() {
                self.detach(conn, Some(detach.clone())).await?;
                changes.detached = detach;
            }
        }

        for (key, id, attributes) in targets {
            match current.get(&key) {
                None => {
                    self.attach_with(conn, vec![(id.clone(), attributes)]).await?;
                    changes.attached.push(id);
                }
                Some(stored) => {
                    let differs = attributes.iter().any(|(column, value)| {
                        pivot_value_key(stored.get(column).unwrap_or(&Value::Null)) != pivot_value_key(value)
                    });
                    if differs {
                        self.update_existing_pivot(conn, id.clone(), attributes).await?;
                        changes.updated.push(id);
                    }
                }
            }
        }

        debug!(
            "Synced {}: {} attached, {} detached, {} updated",
            self.pivot_table,
            changes.attached.len(),
            changes.detached.len(),
            changes.updated.len()
        );
        Ok(changes)
    }

    /// Detach the given ids that are linked and attach the ones that are not
    pub async fn toggle<T: Into<Value>>(&self, conn: &mut dyn DatabaseConnection, ids: Vec<T>) -> ModelResult<ToggleChanges> {
        let current: HashSet<String> = self
            .related_ids(conn)
            .await?
            .iter()
            .filter_map(key_string)
            .collect();

        let mut seen = HashSet::new();
        let mut changes = ToggleChanges::default();
        for id in ids.into_iter().map(Into::<Value>::into) {
            let Some(key) = key_string(&id) else { continue };
            if !seen.insert(key.clone()) {
                continue;
            }

            if current.contains(&key) {
                changes.detached.push(id);
            } else {
                changes.attached.push(id);
            }
        }

        self.detach(conn, Some(changes.detached.clone())).await?;
        self.attach(conn, changes.attached.clone()).await?;
        Ok(changes)
    }

    /// Update attributes on one existing pivot row
    pub async fn update_existing_pivot<T: Into<Value>>(
        &self,
        conn: &mut dyn DatabaseConnection,
        id: T,
        mut attributes: Row,
    ) -> ModelResult<u64> {
        self.ensure_parent_saved()?;

        if self.pivot_timestamps && !attributes.contains_key(PIVOT_UPDATED_AT) {
            attributes.insert(PIVOT_UPDATED_AT.to_string(), fresh_timestamp());
        }

        self.pivot_query()
            .where_eq(&self.related_pivot_key, id)
            .update(conn, attributes)
            .await
    }

    fn ensure_parent_saved(&self) -> ModelResult<()> {
        if self.parent_key.is_null() {
            return Err(ModelError::Relationship(format!(
                "Parent key {} is not set; save the parent before changing {}",
                self.meta.local_key, self.pivot_table
            )));
        }
        Ok(())
    }

    forward_query_constraints!(query);
}

impl<P: Model, R: Model> Relation<P> for BelongsToMany<R> {
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
        let keys = collect_keys(parents, &self.meta.local_key);
        if keys.is_empty() {
            match_empty::<P, Vec<R>>(parents, name);
            return Ok(());
        }

        let foreign_pivot_key = format!("{}.{}", self.pivot_table, self.meta.foreign_key);
        let rows = without_parent_constraint(self.select_query(), self.constraint_count)
            .where_in(&foreign_pivot_key, keys)
            .get_rows(conn)
            .await?;

        let dictionary = build_dictionary(self.hydrate(rows), |record| {
            record.pivot().and_then(|pivot| pivot.get(&self.meta.foreign_key)).cloned()
        });
        match_to_parents::<P, Vec<R>>(parents, name, &self.meta.local_key, &dictionary);
        Ok(())
    }
}
