//! Core Model Trait - Base definition for database entities
//!
//! A model declares its table metadata through associated functions and
//! exposes its [`Record`]; attribute access, mass assignment, dirty
//! tracking, serialization and the relation cache are provided on top.

use std::fmt::Debug;

use serde_json::Value;
use tracing::trace;

use crate::backends::{DatabaseConnection, Row};
use crate::error::ModelResult;
use crate::model::casts::CastKind;
use crate::model::record::{serialize_record, Record, RelationOutput};
use crate::naming;
use crate::relationships::Relation;

/// Core trait for database models
#[allow(async_fn_in_trait)]
pub trait Model: Sized + Send + Sync + Debug {
    /// Column stamped when a record is first inserted
    const CREATED_AT: &'static str = "created_at";

    /// Column stamped on every persisted change
    const UPDATED_AT: &'static str = "updated_at";

    /// Declared type name, e.g. `"BlogPost"`; every default name derives from it
    fn model_name() -> &'static str;

    /// Table name for this model
    fn table_name() -> String {
        naming::table_name(Self::model_name())
    }

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Whether the database generates the primary key on insert
    fn incrementing() -> bool {
        true
    }

    /// Attributes accepted by [`fill`](Self::fill); empty means none
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Attributes and relations left out of serialization
    fn hidden() -> &'static [&'static str] {
        &[]
    }

    /// Attribute casts applied on read and serialization
    fn casts() -> &'static [(&'static str, CastKind)] {
        &[]
    }

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        true
    }

    /// Wrap a record in the model type
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// A fresh, unsaved instance
    fn new() -> Self {
        Self::from_record(Record::default())
    }

    /// A fresh instance filled with the mass-assignable subset of `attributes`
    fn make(attributes: Row) -> Self {
        let mut model = Self::new();
        model.fill(attributes);
        model
    }

    /// Hydrate an existing record from a database row, bypassing the fillable guard
    fn new_from_row(row: Row) -> Self {
        Self::from_record(Record::from_row(row))
    }

    /// Whether `key` may be mass-assigned
    fn is_fillable(key: &str) -> bool {
        Self::fillable().contains(&key)
    }

    /// Mass-assign attributes; keys outside the fillable list are dropped
    fn fill(&mut self, attributes: Row) -> &mut Self {
        for (key, value) in attributes {
            if Self::is_fillable(&key) {
                self.record_mut().attributes.insert(key, value);
            } else {
                trace!("Dropping non-fillable attribute {} on {}", key, Self::model_name());
            }
        }
        self
    }

    /// Assign every attribute regardless of the fillable list
    fn force_fill(&mut self, attributes: Row) -> &mut Self {
        self.record_mut().attributes.extend(attributes);
        self
    }

    /// Cast a raw value the way this model reads `key`
    fn cast_value(key: &str, value: &Value) -> Value {
        match Self::casts().iter().find(|(name, _)| *name == key) {
            Some((_, kind)) => kind.apply(value),
            None => value.clone(),
        }
    }

    /// Attribute value with its cast applied; `Null` when missing
    fn get(&self, key: &str) -> Value {
        self.get_raw(key)
            .map(|value| Self::cast_value(key, value))
            .unwrap_or(Value::Null)
    }

    /// Attribute value as stored
    fn get_raw(&self, key: &str) -> Option<&Value> {
        self.record().attributes.get(key)
    }

    fn set<T: Into<Value>>(&mut self, key: &str, value: T) -> &mut Self {
        self.record_mut().attributes.insert(key.to_string(), value.into());
        self
    }

    fn unset(&mut self, key: &str) -> Option<Value> {
        self.record_mut().attributes.remove(key)
    }

    /// Primary key value, `Null` when unset
    fn key(&self) -> Value {
        self.get_raw(Self::primary_key_name())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn exists(&self) -> bool {
        self.record().exists
    }

    fn original(&self) -> &Row {
        &self.record().original
    }

    /// Attributes that are new or differ from the original snapshot
    fn dirty(&self) -> Row {
        let record = self.record();
        record
            .attributes
            .iter()
            .filter(|(key, value)| record.original.get(key.as_str()) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn is_dirty(&self) -> bool {
        let record = self.record();
        record
            .attributes
            .iter()
            .any(|(key, value)| record.original.get(key.as_str()) != Some(value))
    }

    fn is_dirty_attribute(&self, key: &str) -> bool {
        let record = self.record();
        match record.attributes.get(key) {
            Some(value) => record.original.get(key) != Some(value),
            None => false,
        }
    }

    /// Take a new snapshot of the current attributes
    fn sync_original(&mut self) {
        let record = self.record_mut();
        record.original = record.attributes.clone();
    }

    /// Serializable view: casts applied, hidden removed, relations and pivot included
    fn to_array(&self) -> Row {
        serialize_record::<Self>(self.record())
    }

    fn to_json(&self) -> Value {
        Value::Object(self.to_array())
    }

    /// Pivot row columns when loaded through a many-to-many relation
    fn pivot(&self) -> Option<&Row> {
        self.record().pivot.as_ref()
    }

    /// Resolve a relation once and cache it under `name`
    async fn get_relation<Rel, F>(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        name: &str,
        define: F,
    ) -> ModelResult<Rel::Output>
    where
        Rel: Relation<Self>,
        F: FnOnce(&Self) -> Rel,
    {
        if let Some(cached) = self.record().relations.get(name) {
            return Rel::Output::from_cached(cached);
        }

        self.reload_relation(conn, name, define).await
    }

    /// Resolve a relation again, replacing any cached value
    async fn reload_relation<Rel, F>(
        &mut self,
        conn: &mut dyn DatabaseConnection,
        name: &str,
        define: F,
    ) -> ModelResult<Rel::Output>
    where
        Rel: Relation<Self>,
        F: FnOnce(&Self) -> Rel,
    {
        let results = define(&*self).get_results(conn).await?;
        self.set_relation(name, &results);
        Ok(results)
    }

    fn set_relation<O: RelationOutput>(&mut self, name: &str, value: &O) {
        self.record_mut()
            .relations
            .insert(name.to_string(), value.to_cached());
    }

    fn forget_relation(&mut self, name: &str) -> bool {
        self.record_mut().relations.remove(name).is_some()
    }

    fn relation_loaded(&self, name: &str) -> bool {
        self.record().relations.contains_key(name)
    }

    /// Cached relation without querying; `Ok(None)` when not loaded
    fn loaded_relation<O: RelationOutput>(&self, name: &str) -> ModelResult<Option<O>> {
        self.record()
            .relations
            .get(name)
            .map(O::from_cached)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Account {
        record: Record,
    }

    impl Model for Account {
        fn model_name() -> &'static str {
            "Account"
        }

        fn fillable() -> &'static [&'static str] {
            &["name", "age"]
        }

        fn hidden() -> &'static [&'static str] {
            &["password"]
        }

        fn casts() -> &'static [(&'static str, CastKind)] {
            &[("age", CastKind::Int), ("active", CastKind::Bool)]
        }

        fn from_record(record: Record) -> Self {
            Self { record }
        }

        fn record(&self) -> &Record {
            &self.record
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.record
        }
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Account::table_name(), "accounts");
        assert_eq!(Account::primary_key_name(), "id");
    }

    #[test]
    fn test_fill_drops_non_fillable_keys() {
        let account = Account::make(row(json!({"name": "Ada", "is_admin": true})));
        assert_eq!(account.get("name"), json!("Ada"));
        assert!(account.get_raw("is_admin").is_none());
        assert!(!account.exists());
    }

    #[test]
    fn test_force_fill_bypasses_guard() {
        let mut account = Account::new();
        account.force_fill(row(json!({"is_admin": true})));
        assert_eq!(account.get("is_admin"), json!(true));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut account = Account::new_from_row(row(json!({"id": 1, "name": "Ada"})));
        assert!(account.exists());
        assert!(!account.is_dirty());

        account.set("name", "Grace");
        assert!(account.is_dirty());
        assert!(account.is_dirty_attribute("name"));
        assert!(!account.is_dirty_attribute("id"));
        assert_eq!(account.dirty(), row(json!({"name": "Grace"})));

        account.sync_original();
        assert!(!account.is_dirty());
    }

    #[test]
    fn test_reverting_to_original_value_is_clean() {
        let mut account = Account::new_from_row(row(json!({"id": 1, "name": "Ada"})));
        account.set("name", "Grace");
        account.set("name", "Ada");
        assert!(!account.is_dirty());
    }

    #[test]
    fn test_new_attribute_is_dirty() {
        let mut account = Account::new_from_row(row(json!({"id": 1})));
        account.set("nickname", Value::Null);
        assert!(account.is_dirty_attribute("nickname"));
    }

    #[test]
    fn test_casts_apply_on_read_not_write() {
        let account = Account::new_from_row(row(json!({"id": 1, "age": "30", "active": 0})));
        assert_eq!(account.get("age"), json!(30));
        assert_eq!(account.get_raw("age"), Some(&json!("30")));
        assert_eq!(account.get("active"), json!(false));
        assert_eq!(account.get("missing"), Value::Null);
    }

    #[test]
    fn test_to_array_hides_and_casts() {
        let account = Account::new_from_row(row(json!({"id": 1, "password": "secret", "age": "30"})));
        let array = account.to_array();
        assert!(!array.contains_key("password"));
        assert_eq!(array["age"], json!(30));
        assert_eq!(account.to_json(), json!({"id": 1, "age": 30}));
    }

    #[test]
    fn test_relation_cache_roundtrip() {
        let mut account = Account::new_from_row(row(json!({"id": 1})));
        let friends = vec![Account::new_from_row(row(json!({"id": 2, "password": "x"})))];

        account.set_relation("friends", &friends);
        assert!(account.relation_loaded("friends"));

        let cached: Vec<Account> = account.loaded_relation("friends").unwrap().unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].key(), json!(2));

        assert_eq!(account.to_json()["friends"], json!([{"id": 2}]));

        // asking for the wrong shape is an error, not a silent conversion
        assert!(account.loaded_relation::<Option<Account>>("friends").is_err());

        assert!(account.forget_relation("friends"));
        assert!(!account.relation_loaded("friends"));
    }
}
