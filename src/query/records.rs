//! Result collections.
//!
//! A query returns its records either as an ordered list or, when an index
//! key was configured, as an ordered key → record map.

use crate::document::Row;
use crate::model::ActiveRecord;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Key extractor used to index a result collection.
///
/// Name-based indexing is expressed as a closure too, see [`by_field`] and
/// [`by_attribute`].
pub type IndexBy<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Records returned by `all()`
#[derive(Debug, Clone, PartialEq)]
pub enum Records<T> {
    /// Plain ordered sequence
    List(Vec<T>),
    /// Indexed by key; insertion order kept, later duplicates overwrite earlier ones
    Indexed(IndexMap<String, T>),
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Records::List(Vec::new())
    }
}

impl<T> Records<T> {
    pub fn len(&self) -> usize {
        match self {
            Records::List(items) => items.len(),
            Records::Indexed(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Records::List(items) => Box::new(items.iter()),
            Records::Indexed(map) => Box::new(map.values()),
        }
    }

    pub fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut T> + '_> {
        match self {
            Records::List(items) => Box::new(items.iter_mut()),
            Records::Indexed(map) => Box::new(map.values_mut()),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }

    /// Record stored under `key`; always `None` for a plain list.
    pub fn get(&self, key: &str) -> Option<&T> {
        match self {
            Records::List(_) => None,
            Records::Indexed(map) => map.get(key),
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Records::List(_) => Vec::new(),
            Records::Indexed(map) => map.keys().map(String::as_str).collect(),
        }
    }

    pub fn as_list(&self) -> Option<&[T]> {
        match self {
            Records::List(items) => Some(items),
            Records::Indexed(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, T>> {
        match self {
            Records::List(_) => None,
            Records::Indexed(map) => Some(map),
        }
    }

    /// Drop the keys, keeping record order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Records::List(items) => items,
            Records::Indexed(map) => map.into_values().collect(),
        }
    }
}

impl<T> IntoIterator for Records<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// Index rows by the value of one field.
///
/// Rows missing the field share the empty key.
pub fn by_field(name: impl Into<String>) -> IndexBy<Row> {
    let name = name.into();
    Arc::new(move |row: &Row| row.get(&name).map(key_string).unwrap_or_default())
}

/// Index models by one of their serialized attributes.
pub fn by_attribute<M: ActiveRecord>(name: impl Into<String>) -> IndexBy<M> {
    let name = name.into();
    Arc::new(move |model: &M| model.attribute(&name).as_ref().map(key_string).unwrap_or_default())
}

/// Map key for a JSON value.
///
/// Strings are used verbatim and everything else in its JSON form, so `5`
/// and `"5"` land on the same key.
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
