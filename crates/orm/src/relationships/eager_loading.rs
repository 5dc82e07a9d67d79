//! Eager Loading - dictionary matching of batch query results to parents
//!
//! A batch load runs one query for every parent key, groups the results by
//! their join column, then hands each parent its own slice. Every parent gets
//! a cache entry, so a parent without matches holds an empty list or `None`.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::model::{Model, Record, RelationOutput};
use crate::query::QueryBuilder;

/// Normalized dictionary key for a join value; `None` for `Null`
///
/// Integers and their text form map to the same key, since SQLite hands back
/// whatever affinity a column was written with.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(int), _) => Some(int.to_string()),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                Some((float as i64).to_string())
            }
            _ => Some(n.to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Distinct non-null values of `column` across the parents, in first-seen order
pub fn collect_keys<P: Model>(parents: &[P], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();

    parents
        .iter()
        .filter_map(|parent| parent.get_raw(column))
        .filter(|value| key_string(value).map(|key| seen.insert(key)).unwrap_or(false))
        .cloned()
        .collect()
}

/// Group records by the normalized value `key_of` extracts from each one
pub fn build_dictionary<F>(records: Vec<Record>, key_of: F) -> HashMap<String, Vec<Record>>
where
    F: Fn(&Record) -> Option<Value>,
{
    let mut dictionary: HashMap<String, Vec<Record>> = HashMap::new();

    for record in records {
        if let Some(key) = key_of(&record).as_ref().and_then(key_string) {
            dictionary.entry(key).or_default().push(record);
        }
    }

    dictionary
}

/// Cache each parent's matches under `name`, keyed by the parent's `local_key`
pub fn match_to_parents<P, O>(parents: &mut [P], name: &str, local_key: &str, dictionary: &HashMap<String, Vec<Record>>)
where
    P: Model,
    O: RelationOutput,
{
    for parent in parents.iter_mut() {
        let matches = parent
            .get_raw(local_key)
            .and_then(key_string)
            .and_then(|key| dictionary.get(&key));

        let output = match matches {
            Some(records) => O::from_matches(records.iter().cloned().map(<O::Item as Model>::from_record).collect()),
            None => O::empty(),
        };

        parent.set_relation(name, &output);
    }
}

/// Cache the empty result on every parent; used when no parent has a key
pub fn match_empty<P, O>(parents: &mut [P], name: &str)
where
    P: Model,
    O: RelationOutput,
{
    for parent in parents.iter_mut() {
        parent.set_relation(name, &O::empty());
    }
}

/// Drop the constraints a relation added for its own parent
pub(crate) fn without_parent_constraint<R>(mut query: QueryBuilder<R>, constraint_count: usize) -> QueryBuilder<R> {
    let count = constraint_count.min(query.where_conditions.len());
    query.where_conditions.drain(..count);
    query
}
