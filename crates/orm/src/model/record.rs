//! Record - the attribute state every model wraps
//!
//! A record holds the current attributes, the snapshot they are compared
//! against for dirty tracking, the exists flag, resolved relations and, for
//! models loaded through a many-to-many relation, the pivot row.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::backends::Row;
use crate::error::{ModelError, ModelResult};
use crate::model::core_trait::Model;

/// Attribute state of one model instance
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub(crate) attributes: Row,
    pub(crate) original: Row,
    pub(crate) exists: bool,
    pub(crate) relations: BTreeMap<String, CachedRelation>,
    pub(crate) pivot: Option<Row>,
}

impl Record {
    /// A record as loaded from the database: synced and existing
    pub fn from_row(row: Row) -> Self {
        Self {
            original: row.clone(),
            attributes: row,
            exists: true,
            relations: BTreeMap::new(),
            pivot: None,
        }
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn pivot(&self) -> Option<&Row> {
        self.pivot.as_ref()
    }

    /// Names of relations currently cached
    pub fn loaded_relations(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }
}

/// Shape of a resolved relation
#[derive(Debug, Clone)]
pub enum RelationValue {
    One(Option<Record>),
    Many(Vec<Record>),
}

/// A resolved relation together with the serializer of its related model
#[derive(Debug, Clone)]
pub struct CachedRelation {
    pub(crate) value: RelationValue,
    serialize: fn(&Record) -> Row,
}

impl CachedRelation {
    pub fn value(&self) -> &RelationValue {
        &self.value
    }

    pub(crate) fn to_json(&self) -> Value {
        match &self.value {
            RelationValue::One(None) => Value::Null,
            RelationValue::One(Some(record)) => Value::Object((self.serialize)(record)),
            RelationValue::Many(records) => Value::Array(
                records
                    .iter()
                    .map(|record| Value::Object((self.serialize)(record)))
                    .collect(),
            ),
        }
    }
}

/// Typed result of a relation: `Option<R>` for to-one, `Vec<R>` for to-many
pub trait RelationOutput: Sized {
    type Item: Model;

    /// Copy the result into the form stored in a parent's relation cache
    fn to_cached(&self) -> CachedRelation;

    /// Rebuild the typed result from a cache entry
    fn from_cached(cached: &CachedRelation) -> ModelResult<Self>;

    /// Result used when a parent has no matching rows
    fn empty() -> Self;

    /// Build the result from the rows matched for one parent
    fn from_matches(matches: Vec<Self::Item>) -> Self;
}

impl<R: Model> RelationOutput for Option<R> {
    type Item = R;

    fn to_cached(&self) -> CachedRelation {
        CachedRelation {
            value: RelationValue::One(self.as_ref().map(|model| model.record().clone())),
            serialize: serialize_record::<R>,
        }
    }

    fn from_cached(cached: &CachedRelation) -> ModelResult<Self> {
        match &cached.value {
            RelationValue::One(record) => Ok(record.clone().map(R::from_record)),
            RelationValue::Many(_) => Err(ModelError::Relationship(format!(
                "Cached relation holds many {} records, expected at most one",
                R::model_name()
            ))),
        }
    }

    fn empty() -> Self {
        None
    }

    fn from_matches(matches: Vec<R>) -> Self {
        matches.into_iter().next()
    }
}

impl<R: Model> RelationOutput for Vec<R> {
    type Item = R;

    fn to_cached(&self) -> CachedRelation {
        CachedRelation {
            value: RelationValue::Many(self.iter().map(|model| model.record().clone()).collect()),
            serialize: serialize_record::<R>,
        }
    }

    fn from_cached(cached: &CachedRelation) -> ModelResult<Self> {
        match &cached.value {
            RelationValue::Many(records) => Ok(records.iter().cloned().map(R::from_record).collect()),
            RelationValue::One(_) => Err(ModelError::Relationship(format!(
                "Cached relation holds a single {} record, expected a list",
                R::model_name()
            ))),
        }
    }

    fn empty() -> Self {
        Vec::new()
    }

    fn from_matches(matches: Vec<R>) -> Self {
        matches
    }
}

/// Serialize a record with the casts and hidden list of model `M`
pub fn serialize_record<M: Model>(record: &Record) -> Row {
    let hidden = M::hidden();
    let mut output = Row::new();

    for (key, value) in &record.attributes {
        if hidden.contains(&key.as_str()) {
            continue;
        }
        output.insert(key.clone(), M::cast_value(key, value));
    }

    for (name, relation) in &record.relations {
        if !hidden.contains(&name.as_str()) {
            output.insert(name.clone(), relation.to_json());
        }
    }

    if let Some(pivot) = &record.pivot {
        output.insert("pivot".to_string(), Value::Object(pivot.clone()));
    }

    output
}
