//! # Aranguard
//!
//! Active record queries over ArangoDB: typed models, relations (direct,
//! through a pivot collection, or through another relation), eager and lazy
//! loading, and hydration of cursor rows into models or plain rows.
//!
//! Connections are passed explicitly: every executor takes a
//! [`ConnectionSource`], either a single [`Connection`] or a
//! [`ConnectionManager`] resolving the model's configured connection name.

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod document;
pub mod executor;
pub mod metrics;
pub mod model;
pub mod query;
pub mod relation;
#[cfg(any(test, feature = "mock"))]
pub mod test_helpers;

pub use config::DatabaseConfig;
pub use connection::{
    Connection, ConnectionError, ConnectionManager, ConnectionSource, DEFAULT_CONNECTION,
};
pub use diagnostics::{Diagnostics, LogDiagnostics, ProfileSpan, QUERY_CATEGORY};
pub use document::{Document, DocumentHandle, RawRow, Row};
pub use executor::{BackendError, Cursor, DocumentExecutor, HttpExecutor};
pub use model::{ActiveRecord, AnyRecord, DocumentRecord, RecordState};
pub use query::{
    ActiveQuery, ArrayQuery, CompareOp, Condition, IndexBy, Order, Query, QueryError, Records,
    Statement,
};
pub use relation::{ErasedRelation, LazyLoader, Link, Related, RelationCache, Via};
