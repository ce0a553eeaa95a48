//! Active record models.
//!
//! A model is a plain serde struct that also carries a [`RecordState`]: the
//! new-record flag and the cache of relations already resolved for it. Rows
//! are turned into models by serde deserialization and models expose their
//! attributes by serialization, so field names in the struct are the
//! document attribute names.
//!
//! # Example
//!
//! ```
//! use aranguard::{ActiveQuery, ActiveRecord, ErasedRelation, Link, RecordState};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Post {
//!     #[serde(rename = "_key")]
//!     key: String,
//!     author_id: String,
//!     #[serde(skip)]
//!     state: RecordState,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Author {
//!     #[serde(rename = "_key")]
//!     key: String,
//!     name: String,
//!     #[serde(skip)]
//!     state: RecordState,
//! }
//!
//! impl ActiveRecord for Post {
//!     fn collection_name() -> &'static str {
//!         "posts"
//!     }
//!     fn state(&self) -> &RecordState {
//!         &self.state
//!     }
//!     fn state_mut(&mut self) -> &mut RecordState {
//!         &mut self.state
//!     }
//! }
//!
//! impl ActiveRecord for Author {
//!     fn collection_name() -> &'static str {
//!         "authors"
//!     }
//!     fn state(&self) -> &RecordState {
//!         &self.state
//!     }
//!     fn state_mut(&mut self) -> &mut RecordState {
//!         &mut self.state
//!     }
//!     fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
//!         match name {
//!             "posts" => {
//!                 Some(ActiveQuery::<Post>::has_many(Link::new([("author_id", "_key")])).boxed())
//!             }
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use crate::connection::DEFAULT_CONNECTION;
use crate::document::Row;
use crate::query::{ActiveQuery, QueryError};
use crate::relation::{ErasedRelation, Related, RelationCache};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt::Debug;

/// Per-instance bookkeeping that is not part of the stored document
#[derive(Debug, Clone)]
pub struct RecordState {
    is_new_record: bool,
    relations: RelationCache,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            is_new_record: true,
            relations: RelationCache::default(),
        }
    }
}

impl RecordState {
    pub fn is_new_record(&self) -> bool {
        self.is_new_record
    }

    pub fn set_is_new_record(&mut self, value: bool) {
        self.is_new_record = value;
    }

    pub fn relations(&self) -> &RelationCache {
        &self.relations
    }

    pub fn relations_mut(&mut self) -> &mut RelationCache {
        &mut self.relations
    }
}

/// A model stored in one collection
pub trait ActiveRecord: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Collection the model is read from
    fn collection_name() -> &'static str;

    /// Name of the connection this model uses
    fn connection_name() -> &'static str {
        DEFAULT_CONNECTION
    }

    fn state(&self) -> &RecordState;

    fn state_mut(&mut self) -> &mut RecordState;

    /// Build a model from a (possibly remapped) row.
    ///
    /// Attributes the struct does not declare are ignored.
    fn instantiate(row: Row) -> Result<Self, QueryError> {
        serde_json::from_value(Value::Object(row)).map_err(|e| QueryError::Hydration {
            model: Self::collection_name(),
            message: e.to_string(),
        })
    }

    /// Serialized attributes of the model.
    fn attributes(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                log::warn!("{} serialized to a non-object value: {other}", Self::collection_name());
                Row::new()
            }
            Err(err) => {
                log::warn!("{} could not be serialized: {err}", Self::collection_name());
                Row::new()
            }
        }
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes().remove(name)
    }

    fn is_new_record(&self) -> bool {
        self.state().is_new_record()
    }

    fn set_is_new_record(&mut self, value: bool) {
        self.state_mut().set_is_new_record(value);
    }

    /// Hook run after the model was loaded and its eager relations populated.
    fn after_find(&mut self) {}

    /// Relation declared under `name`, unbound to any parent.
    fn relation(_name: &str) -> Option<Box<dyn ErasedRelation>> {
        None
    }

    /// Query over this model's collection.
    fn find() -> ActiveQuery<Self> {
        ActiveQuery::new()
    }

    /// Store a resolved relation, replacing any previous value.
    fn populate_relation(&mut self, name: &str, related: Related) {
        self.state_mut().relations_mut().insert(name, related);
    }

    fn is_relation_populated(&self, name: &str) -> bool {
        self.state().relations().contains(name)
    }

    fn related(&self, name: &str) -> Option<&Related> {
        self.state().relations().get(name)
    }
}

/// Type-erased record: either a model or a plain row
///
/// Relations resolve into these so that a relation result can be stored
/// whatever the related type is.
pub trait AnyRecord: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Attributes used for key extraction.
    fn to_row(&self) -> Row;

    /// Attach a resolved relation.
    fn attach_related(&mut self, name: &str, related: Related);

    /// Rows of the relation attached under `name`; empty when none is.
    fn related_rows(&self, name: &str) -> Vec<Row>;

    fn clone_record(&self) -> Box<dyn AnyRecord>;
}

impl<M: ActiveRecord> AnyRecord for M {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_row(&self) -> Row {
        self.attributes()
    }

    fn attach_related(&mut self, name: &str, related: Related) {
        self.populate_relation(name, related);
    }

    fn related_rows(&self, name: &str) -> Vec<Row> {
        self.related(name).map(Related::to_rows).unwrap_or_default()
    }

    fn clone_record(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }
}

/// Array-mode records carry their relations inline, as JSON under the
/// relation name.
impl AnyRecord for Row {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_row(&self) -> Row {
        self.clone()
    }

    fn attach_related(&mut self, name: &str, related: Related) {
        self.insert(name.to_owned(), related.to_json());
    }

    fn related_rows(&self, name: &str) -> Vec<Row> {
        match self.get(name) {
            Some(Value::Object(row)) => vec![row.clone()],
            Some(Value::Array(items)) => {
                items.iter().filter_map(|v| v.as_object().cloned()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn clone_record(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }
}

/// Schemaless model, used for pivot collections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(flatten)]
    pub fields: Row,
    #[serde(skip)]
    state: RecordState,
}

impl DocumentRecord {
    pub fn new(fields: Row) -> Self {
        Self {
            fields,
            state: RecordState::default(),
        }
    }
}

impl ActiveRecord for DocumentRecord {
    /// Queries over documents always name their collection with `from`.
    fn collection_name() -> &'static str {
        ""
    }

    fn state(&self) -> &RecordState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }

    fn attributes(&self) -> Row {
        self.fields.clone()
    }
}
