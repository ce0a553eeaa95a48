//! Raw records returned by the storage backend.
//!
//! ArangoDB cursors yield JSON values. Full documents carry the `_id`/`_key`
//! system attributes and are surfaced as [`Document`] wrappers; projections
//! (`RETURN [doc.a, doc.b]`) come back as positional tuples. Everything is
//! unwrapped into a plain [`Row`] before it reaches application code.

use serde_json::{Map, Value};

/// Ordered field → value mapping.
///
/// Field order is the order the backend returned, which matters for the
/// positional column remap applied by the hydrator.
pub type Row = Map<String, Value>;

/// Handle identifying a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// `_id`, i.e. `collection/key`
    pub id: String,
    /// `_key`
    pub key: String,
    /// `_rev`, when the backend returned it
    pub rev: Option<String>,
}

/// Backend-native document wrapper.
///
/// Keeps the full attribute map (system attributes included) in backend order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    handle: DocumentHandle,
    attributes: Row,
}

impl Document {
    /// Wrap an object that carries `_id` and `_key`.
    ///
    /// Returns the object back unchanged when either system attribute is missing.
    pub fn from_object(attributes: Row) -> Result<Self, Row> {
        let id = attributes.get("_id").and_then(Value::as_str).map(str::to_owned);
        let key = attributes.get("_key").and_then(Value::as_str).map(str::to_owned);
        match (id, key) {
            (Some(id), Some(key)) => {
                let rev = attributes.get("_rev").and_then(Value::as_str).map(str::to_owned);
                Ok(Self {
                    handle: DocumentHandle { id, key, rev },
                    attributes,
                })
            }
            _ => Err(attributes),
        }
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// All attributes, system attributes included, in backend order.
    pub fn get_all(&self) -> Row {
        self.attributes.clone()
    }

    pub fn into_row(self) -> Row {
        self.attributes
    }
}

/// One record as produced by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Stored document with system attributes
    Document(Document),
    /// Plain object (computed projection, pivot row without handle, ...)
    Object(Row),
    /// Positional projection such as `RETURN [doc.a, doc.b]`
    Tuple(Vec<Value>),
    /// Bare scalar (`RETURN 1`, `RETURN length`)
    Scalar(Value),
}

impl RawRow {
    /// Classify a JSON value returned by the backend.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => match Document::from_object(map) {
                Ok(doc) => RawRow::Document(doc),
                Err(map) => RawRow::Object(map),
            },
            Value::Array(items) => RawRow::Tuple(items),
            other => RawRow::Scalar(other),
        }
    }

    /// Unwrap to a plain mapping.
    ///
    /// Tuples and scalars are keyed by their position (`"0"`, `"1"`, ...), so a
    /// positional remap can later rename them.
    pub fn into_row(self) -> Row {
        match self {
            RawRow::Document(doc) => doc.into_row(),
            RawRow::Object(row) => row,
            RawRow::Tuple(items) => items
                .into_iter()
                .enumerate()
                .map(|(pos, value)| (pos.to_string(), value))
                .collect(),
            RawRow::Scalar(value) => {
                let mut row = Row::new();
                row.insert("0".to_owned(), value);
                row
            }
        }
    }

    /// The row as a single JSON value, without unwrapping into a mapping.
    pub fn into_value(self) -> Value {
        match self {
            RawRow::Document(doc) => Value::Object(doc.into_row()),
            RawRow::Object(row) => Value::Object(row),
            RawRow::Tuple(items) => Value::Array(items),
            RawRow::Scalar(value) => value,
        }
    }
}

impl From<Value> for RawRow {
    fn from(value: Value) -> Self {
        RawRow::from_value(value)
    }
}
