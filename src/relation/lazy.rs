//! Lazy loading for related records.
//!
//! A [`LazyLoader`] resolves a parent's relations on first access and keeps
//! the results in the parent's relation cache, so repeated access does not
//! query again. Records of a named via relation resolved on the way are
//! cached under their own name too.
//!
//! # Example
//!
//! ```no_run
//! use aranguard::{ActiveRecord, ConnectionManager, LazyLoader};
//! # use aranguard::RecordState;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize)]
//! # struct Tag { #[serde(skip)] state: RecordState }
//! # impl ActiveRecord for Tag {
//! #     fn collection_name() -> &'static str { "tags" }
//! #     fn state(&self) -> &RecordState { &self.state }
//! #     fn state_mut(&mut self) -> &mut RecordState { &mut self.state }
//! # }
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
//! let mut tag = Tag::find().one(&db)?.expect("tag");
//! let mut loader = LazyLoader::new(&mut tag, &db);
//! let posts = loader.load_many::<Post>("posts")?;
//! for post in posts {
//!     println!("{}", post.title);
//! }
//! # Ok(())
//! # }
//! ```

use crate::connection::ConnectionSource;
use crate::model::{ActiveRecord, AnyRecord};
use crate::query::QueryError;
use crate::relation::cache::Related;

/// On-demand relation access for one parent record
pub struct LazyLoader<'a, P: ActiveRecord> {
    parent: &'a mut P,
    db: &'a dyn ConnectionSource,
}

impl<'a, P: ActiveRecord> LazyLoader<'a, P> {
    pub fn new(parent: &'a mut P, db: &'a dyn ConnectionSource) -> Self {
        Self { parent, db }
    }

    /// Relation `name` of the parent, resolved and cached on first access.
    ///
    /// # Errors
    ///
    /// `QueryError::UnknownRelation` if the parent declares no such relation;
    /// otherwise whatever resolving the relation returns. Nothing is cached on
    /// failure.
    pub fn load(&mut self, name: &str) -> Result<&Related, QueryError> {
        if !self.parent.is_relation_populated(name) {
            let mut relation = P::relation(name).ok_or_else(|| QueryError::UnknownRelation {
                model: P::collection_name(),
                relation: name.to_owned(),
            })?;
            relation.bind_primary(self.parent.to_row());
            let (related, via_cache) = relation.resolve(self.db)?;
            log::debug!(
                "lazy loaded {} ({} record(s)) for {}",
                name,
                related.len(),
                P::collection_name()
            );

            let relations = self.parent.state_mut().relations_mut();
            relations.extend(via_cache);
            relations.insert(name, related);
        }
        self.parent
            .related(name)
            .ok_or_else(|| {
                QueryError::UnexpectedResult(format!("relation {name} missing after load"))
            })
    }

    /// Single related record, downcast to `M`.
    pub fn load_one<M: AnyRecord>(&mut self, name: &str) -> Result<Option<&M>, QueryError> {
        Ok(self.load(name)?.as_one::<M>())
    }

    /// Related records, downcast to `M`.
    pub fn load_many<M: AnyRecord>(&mut self, name: &str) -> Result<Vec<&M>, QueryError> {
        Ok(self.load(name)?.as_many::<M>())
    }

    /// Drop the cached result so the next access queries again.
    pub fn reset(&mut self, name: &str) {
        self.parent.state_mut().relations_mut().remove(name);
    }
}
