//! Model-aware queries and relations.
//!
//! [`ActiveQuery`] wraps a base [`Query`] with everything needed to load
//! models: hydration, indexing, eager loading (`with`) and, when used as a
//! relation, the link to a parent record and the optional via descriptor.
//!
//! Relation filters are composed at execution time. A query bound to a
//! parent (see [`ActiveQuery::primary`]) narrows itself to the records
//! linked to that parent: directly by the parent's keys, through the rows of
//! a pivot collection, or through the records of another named relation.
//! Composition happens on a copy, so a query can be executed any number of
//! times and never accumulates filters.
//!
//! # Example
//!
//! ```no_run
//! use aranguard::{ActiveRecord, Condition, ConnectionManager, Order};
//! # use aranguard::RecordState;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize)]
//! # struct Post { title: String, #[serde(skip)] state: RecordState }
//! # impl ActiveRecord for Post {
//! #     fn collection_name() -> &'static str { "posts" }
//! #     fn state(&self) -> &RecordState { &self.state }
//! #     fn state_mut(&mut self) -> &mut RecordState { &mut self.state }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ConnectionManager::load()?;
//! let posts = Post::find()
//!     .filter(Condition::eq("status", "published"))
//!     .order_by("created_at", Order::Desc)
//!     .limit(10)
//!     .all(&db)?;
//! # Ok(())
//! # }
//! ```

use crate::connection::{Connection, ConnectionSource};
use crate::document::Row;
use crate::model::{ActiveRecord, AnyRecord, DocumentRecord};
use crate::query::builder::Query;
use crate::query::condition::{Condition, Order};
use crate::query::error::QueryError;
use crate::query::hydrate::{hydrate_models, index_records, prepare_rows};
use crate::query::records::{by_attribute, by_field, IndexBy, Records};
use crate::relation::def::{Link, Via};
use crate::relation::eager::find_with;
use crate::relation::erased::ErasedRelation;
use crate::relation::helpers::link_condition;
use crate::relation::RelationCache;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Query returning models of type `M`
pub struct ActiveQuery<M> {
    pub(crate) query: Query,
    pub(crate) as_array: bool,
    pub(crate) index_by: Option<IndexBy<M>>,
    pub(crate) with: Vec<String>,
    pub(crate) primary_model: Option<Row>,
    pub(crate) link: Link,
    pub(crate) multiple: bool,
    pub(crate) via: Via,
    pub(crate) connection: Option<&'static str>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for ActiveQuery<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            as_array: self.as_array,
            index_by: self.index_by.clone(),
            with: self.with.clone(),
            primary_model: self.primary_model.clone(),
            link: self.link.clone(),
            multiple: self.multiple,
            via: self.via.clone(),
            connection: self.connection,
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for ActiveQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveQuery")
            .field("model", &std::any::type_name::<M>())
            .field("query", &self.query)
            .field("as_array", &self.as_array)
            .field("indexed", &self.index_by.is_some())
            .field("with", &self.with)
            .field("primary_model", &self.primary_model)
            .field("link", &self.link)
            .field("multiple", &self.multiple)
            .field("via", &self.via)
            .field("connection", &self.connection)
            .finish()
    }
}

impl<M: ActiveRecord> Default for ActiveQuery<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ActiveRecord> ActiveQuery<M> {
    /// Top-level query over `M`'s collection.
    pub fn new() -> Self {
        Self {
            query: Query::new(),
            as_array: false,
            index_by: None,
            with: Vec::new(),
            primary_model: None,
            link: Link::default(),
            multiple: true,
            via: Via::Direct,
            connection: None,
            _model: PhantomData,
        }
    }

    /// Relation returning any number of `M` records.
    pub fn has_many(link: Link) -> Self {
        Self {
            link,
            multiple: true,
            ..Self::new()
        }
    }

    /// Relation returning at most one `M` record.
    pub fn has_one(link: Link) -> Self {
        Self {
            link,
            multiple: false,
            ..Self::new()
        }
    }

    pub fn from(mut self, collection: impl Into<String>) -> Self {
        self.query = self.query.from(collection);
        self
    }

    /// Positional select list.
    ///
    /// Returned fields are renamed by position to these names before
    /// hydration.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = self.query.select(columns);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.query = self.query.filter(condition);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.query = self.query.order_by(field, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub fn emulate_execution(mut self) -> Self {
        self.query = self.query.emulate_execution();
        self
    }

    /// Relations to load eagerly; dotted names load nested relations.
    pub fn with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with.extend(names.into_iter().map(Into::into));
        self
    }

    /// Index `all()` results by the key `f` computes.
    pub fn index_by<F>(mut self, f: F) -> Self
    where
        F: Fn(&M) -> String + Send + Sync + 'static,
    {
        self.index_by = Some(Arc::new(f));
        self
    }

    /// Index `all()` results by one attribute.
    pub fn index_by_attribute(mut self, name: impl Into<String>) -> Self {
        self.index_by = Some(by_attribute::<M>(name));
        self
    }

    /// Bind the parent record this relation is resolved for.
    pub fn primary<P: AnyRecord + ?Sized>(mut self, parent: &P) -> Self {
        self.bind_primary(parent.to_row());
        self
    }

    pub(crate) fn bind_primary(&mut self, primary: Row) {
        if let Via::Named { relation, .. } = &mut self.via {
            relation.bind_primary(primary.clone());
        }
        self.primary_model = Some(primary);
    }

    /// Reach the records through pivot collection `collection`.
    ///
    /// `link` joins the pivot rows to the parent; the relation's own link
    /// joins this collection to the pivot rows. The pivot collection is read
    /// over `M`'s connection.
    pub fn via_collection(mut self, collection: impl Into<String>, link: Link) -> Self {
        let pivot = ActiveQuery::<DocumentRecord>::has_many(link)
            .from(collection)
            .on_connection(M::connection_name())
            .as_array();
        self.via = Via::Pivot(pivot.boxed());
        self
    }

    /// Run on the named connection instead of `M::connection_name()`.
    pub fn on_connection(mut self, name: &'static str) -> Self {
        self.connection = Some(name);
        self
    }

    /// Reach the records through another relation of the parent.
    ///
    /// When resolved lazily, the records of that relation are cached under
    /// `name` as well.
    pub fn via(mut self, name: impl Into<String>, relation: Box<dyn ErasedRelation>) -> Self {
        let mut relation = relation;
        if let Some(primary) = &self.primary_model {
            relation.bind_primary(primary.clone());
        }
        self.via = Via::Named {
            name: name.into(),
            relation,
        };
        self
    }

    /// Return plain rows instead of models.
    pub fn as_array(mut self) -> ArrayQuery<M> {
        self.as_array = true;
        self.index_by = None;
        ArrayQuery {
            inner: self,
            index_by: None,
        }
    }

    pub fn boxed(self) -> Box<dyn ErasedRelation> {
        Box::new(self)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn via_descriptor(&self) -> &Via {
        &self.via
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn primary_model(&self) -> Option<&Row> {
        self.primary_model.as_ref()
    }

    /// Narrow the query to records linked to `rows`.
    ///
    /// When the rows carry no key the query switches to emulated execution
    /// and returns nothing.
    pub fn filter_by_models(&mut self, rows: &[Row]) {
        match link_condition(&self.link, rows) {
            Some(condition) => self.query.and_where(condition),
            None => self.query.emulate_execution = true,
        }
    }

    /// Add the relation filters for the bound parent, if any.
    ///
    /// Returns the records of a named via relation keyed by its name, for the
    /// caller to attach to the parent.
    ///
    /// # Errors
    ///
    /// Errors from resolving the pivot rows or the via relation are returned
    /// unchanged.
    pub fn compose_filters(
        &mut self,
        db: &dyn ConnectionSource,
    ) -> Result<RelationCache, QueryError> {
        let mut cache = RelationCache::new();
        let Some(primary) = self.primary_model.clone() else {
            return Ok(cache);
        };

        let key_rows = match &self.via {
            Via::Direct => vec![primary],
            Via::Pivot(pivot) => {
                #[cfg(feature = "tracing")]
                let _span = crate::metrics::tracing_helpers::via_resolution_span("pivot").entered();
                pivot.find_pivot_rows(std::slice::from_ref(&primary), db)?
            }
            Via::Named { name, relation } => {
                #[cfg(feature = "tracing")]
                let _span = crate::metrics::tracing_helpers::via_resolution_span(name).entered();
                let (related, nested) = relation.resolve(db)?;
                let rows = related.to_rows();
                cache.extend(nested);
                cache.insert(name.clone(), related);
                rows
            }
        };

        self.filter_by_models(&key_rows);
        Ok(cache)
    }

    /// Name of the connection this query runs on.
    pub fn connection_name(&self) -> &'static str {
        self.connection.unwrap_or_else(M::connection_name)
    }

    fn connection<'d>(&self, db: &'d dyn ConnectionSource) -> Result<&'d Connection, QueryError> {
        db.connection_for(self.connection_name())
    }

    /// Copy of the query with relation filters composed.
    fn prepared(&self, db: &dyn ConnectionSource) -> Result<(Self, RelationCache), QueryError> {
        let mut prepared = self.clone();
        let cache = prepared.compose_filters(db)?;
        Ok((prepared, cache))
    }

    /// Execute and return unwrapped, remapped rows.
    pub(crate) fn fetch_rows(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Vec<Row>, RelationCache), QueryError> {
        let conn = self.connection(db)?;
        let (prepared, cache) = self.prepared(db)?;
        let raw = prepared.query.all(conn, M::collection_name())?;
        Ok((prepare_rows(raw, prepared.query.select_list()), cache))
    }

    /// Execute capped at one row.
    pub(crate) fn fetch_row(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Option<Row>, RelationCache), QueryError> {
        let conn = self.connection(db)?;
        let (prepared, cache) = self.prepared(db)?;
        let row = prepared
            .query
            .one(conn, M::collection_name())?
            .map(|raw| prepare_rows(vec![raw], prepared.query.select_list()))
            .and_then(|rows| rows.into_iter().next());
        Ok((row, cache))
    }

    /// Hydrate, eager load, then run the post-load hook.
    pub(crate) fn load_models(
        &self,
        rows: Vec<Row>,
        db: &dyn ConnectionSource,
    ) -> Result<Vec<M>, QueryError> {
        let mut models = hydrate_models::<M>(rows)?;
        if !self.with.is_empty() {
            let mut records: Vec<&mut dyn AnyRecord> =
                models.iter_mut().map(|m| m as &mut dyn AnyRecord).collect();
            find_with::<M>(&self.with, &mut records, false, db)?;
        }
        for model in &mut models {
            model.after_find();
        }
        Ok(models)
    }

    /// Eager load onto plain rows.
    pub(crate) fn load_rows(
        &self,
        mut rows: Vec<Row>,
        db: &dyn ConnectionSource,
    ) -> Result<Vec<Row>, QueryError> {
        if !self.with.is_empty() {
            let mut records: Vec<&mut dyn AnyRecord> =
                rows.iter_mut().map(|r| r as &mut dyn AnyRecord).collect();
            find_with::<M>(&self.with, &mut records, true, db)?;
        }
        Ok(rows)
    }

    /// All matching models.
    ///
    /// Zero rows give an empty collection.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as [`QueryError::Execution`] with the
    /// backend's message and code.
    pub fn all(&self, db: &dyn ConnectionSource) -> Result<Records<M>, QueryError> {
        self.all_with_relations(db).map(|(records, _)| records)
    }

    /// Like [`all`](Self::all), also returning the via relation records
    /// resolved for the bound parent.
    pub fn all_with_relations(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Records<M>, RelationCache), QueryError> {
        let (rows, cache) = self.fetch_rows(db)?;
        if rows.is_empty() {
            return Ok((Records::default(), cache));
        }
        let models = self.load_models(rows, db)?;
        Ok((index_records(models, self.index_by.as_ref()), cache))
    }

    /// First matching model, or `None` when nothing matched.
    pub fn one(&self, db: &dyn ConnectionSource) -> Result<Option<M>, QueryError> {
        self.one_with_relations(db).map(|(model, _)| model)
    }

    pub fn one_with_relations(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Option<M>, RelationCache), QueryError> {
        let (row, cache) = self.fetch_row(db)?;
        let Some(row) = row else {
            return Ok((None, cache));
        };
        let model = self.load_models(vec![row], db)?.into_iter().next();
        Ok((model, cache))
    }

    pub fn count(&self, db: &dyn ConnectionSource) -> Result<u64, QueryError> {
        let conn = self.connection(db)?;
        let (prepared, _) = self.prepared(db)?;
        prepared.query.count(conn, M::collection_name())
    }

    pub fn exists(&self, db: &dyn ConnectionSource) -> Result<bool, QueryError> {
        let conn = self.connection(db)?;
        let (prepared, _) = self.prepared(db)?;
        prepared.query.exists(conn, M::collection_name())
    }
}

/// Query returning plain rows for model `M`'s collection
///
/// Rows are unwrapped from backend documents and renamed by the select list;
/// eager-loaded relations are inlined as JSON under their names.
pub struct ArrayQuery<M> {
    inner: ActiveQuery<M>,
    index_by: Option<IndexBy<Row>>,
}

impl<M> Clone for ArrayQuery<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            index_by: self.index_by.clone(),
        }
    }
}

impl<M> fmt::Debug for ArrayQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayQuery")
            .field("inner", &self.inner)
            .field("indexed", &self.index_by.is_some())
            .finish()
    }
}

impl<M: ActiveRecord> ArrayQuery<M> {
    /// Index `all()` results by the key `f` computes from each row.
    pub fn index_by<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> String + Send + Sync + 'static,
    {
        self.index_by = Some(Arc::new(f));
        self
    }

    /// Index `all()` results by one field.
    pub fn index_by_field(mut self, name: impl Into<String>) -> Self {
        self.index_by = Some(by_field(name));
        self
    }

    pub fn inner(&self) -> &ActiveQuery<M> {
        &self.inner
    }

    pub fn boxed(self) -> Box<dyn ErasedRelation> {
        self.inner.boxed()
    }

    pub fn all(&self, db: &dyn ConnectionSource) -> Result<Records<Row>, QueryError> {
        self.all_with_relations(db).map(|(records, _)| records)
    }

    pub fn all_with_relations(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Records<Row>, RelationCache), QueryError> {
        let (rows, cache) = self.inner.fetch_rows(db)?;
        if rows.is_empty() {
            return Ok((Records::default(), cache));
        }
        let rows = self.inner.load_rows(rows, db)?;
        Ok((index_records(rows, self.index_by.as_ref()), cache))
    }

    pub fn one(&self, db: &dyn ConnectionSource) -> Result<Option<Row>, QueryError> {
        let (row, _) = self.inner.fetch_row(db)?;
        match row {
            None => Ok(None),
            Some(row) => Ok(self.inner.load_rows(vec![row], db)?.into_iter().next()),
        }
    }

    pub fn count(&self, db: &dyn ConnectionSource) -> Result<u64, QueryError> {
        self.inner.count(db)
    }

    pub fn exists(&self, db: &dyn ConnectionSource) -> Result<bool, QueryError> {
        self.inner.exists(db)
    }
}
