//! Resolved relation results.

use crate::document::Row;
use crate::model::AnyRecord;
use serde_json::Value;
use std::collections::HashMap;

/// Result of resolving one relation for one parent
#[derive(Debug)]
pub enum Related {
    /// Single-record relation; `None` when nothing matched
    One(Option<Box<dyn AnyRecord>>),
    /// Multi-record relation, in query order
    Many(Vec<Box<dyn AnyRecord>>),
}

impl Clone for Related {
    fn clone(&self) -> Self {
        match self {
            Related::One(record) => Related::One(record.as_ref().map(|r| r.clone_record())),
            Related::Many(records) => {
                Related::Many(records.iter().map(|r| r.clone_record()).collect())
            }
        }
    }
}

impl Related {
    pub fn records(&self) -> Vec<&dyn AnyRecord> {
        match self {
            Related::One(record) => record.iter().map(|r| &**r).collect(),
            Related::Many(records) => records.iter().map(|r| &**r).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Related::One(record) => usize::from(record.is_some()),
            Related::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attributes of every record, used as key rows for a dependent relation.
    pub fn to_rows(&self) -> Vec<Row> {
        self.records().into_iter().map(|r| r.to_row()).collect()
    }

    /// `null`, an object, or an array of objects.
    pub fn to_json(&self) -> Value {
        match self {
            Related::One(None) => Value::Null,
            Related::One(Some(record)) => Value::Object(record.to_row()),
            Related::Many(records) => {
                Value::Array(records.iter().map(|r| Value::Object(r.to_row())).collect())
            }
        }
    }

    /// The single record as `T`, if it is one.
    pub fn as_one<T: AnyRecord>(&self) -> Option<&T> {
        match self {
            Related::One(Some(record)) => record.as_any().downcast_ref::<T>(),
            Related::Many(records) => records.first().and_then(|r| r.as_any().downcast_ref::<T>()),
            Related::One(None) => None,
        }
    }

    /// Every record that is a `T`.
    pub fn as_many<T: AnyRecord>(&self) -> Vec<&T> {
        self.records()
            .into_iter()
            .filter_map(|r| r.as_any().downcast_ref::<T>())
            .collect()
    }
}

/// Relation results keyed by relation name
#[derive(Debug, Clone, Default)]
pub struct RelationCache {
    entries: HashMap<String, Related>,
}

impl RelationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, related: Related) {
        self.entries.insert(name.into(), related);
    }

    pub fn get(&self, name: &str) -> Option<&Related> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Related> {
        self.entries.remove(name)
    }

    pub fn extend(&mut self, other: RelationCache) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Single related record of type `T`.
    pub fn one<T: AnyRecord>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Related::as_one::<T>)
    }

    /// Related records of type `T`; empty if the relation was never resolved.
    pub fn many<T: AnyRecord>(&self, name: &str) -> Vec<&T> {
        self.get(name).map(Related::as_many::<T>).unwrap_or_default()
    }
}
