//! Object-safe relation view.
//!
//! Via chains and eager loading handle relations whose target model is not
//! known statically. [`ErasedRelation`] is what they see of an
//! [`ActiveQuery`]; results come back as [`AnyRecord`] boxes.

use crate::connection::ConnectionSource;
use crate::document::Row;
use crate::model::{ActiveRecord, AnyRecord};
use crate::query::{ActiveQuery, QueryError};
use crate::relation::cache::{Related, RelationCache};
use crate::relation::def::{Link, Via};
use crate::relation::eager::{assign_buckets, build_buckets, keys_through, parent_keys};
use std::fmt::Debug;

/// A relation query with its target type erased
pub trait ErasedRelation: Debug + Send + Sync {
    fn is_multiple(&self) -> bool;

    fn link(&self) -> &Link;

    fn via(&self) -> &Via;

    fn is_array(&self) -> bool;

    /// Return plain rows instead of models.
    fn set_as_array(&mut self);

    /// Bind the parent record (and the parent of a named via relation).
    fn bind_primary(&mut self, primary: Row);

    /// Eager-load these relations on the related records too.
    fn add_with(&mut self, names: &[String]);

    /// Rows of this (pivot) relation linked to `primaries`.
    fn find_pivot_rows(
        &self,
        primaries: &[Row],
        db: &dyn ConnectionSource,
    ) -> Result<Vec<Row>, QueryError>;

    /// Resolve for the bound parent.
    ///
    /// Returns the relation result together with the records of any named via
    /// relation resolved on the way.
    fn resolve(&self, db: &dyn ConnectionSource) -> Result<(Related, RelationCache), QueryError>;

    /// Resolve for every parent at once and attach the results under `name`.
    ///
    /// A named via relation is populated on the parents first, under its
    /// own name. Returns all related records loaded.
    fn populate(
        &self,
        name: &str,
        primaries: &mut [&mut dyn AnyRecord],
        db: &dyn ConnectionSource,
    ) -> Result<Vec<Box<dyn AnyRecord>>, QueryError>;

    fn clone_box(&self) -> Box<dyn ErasedRelation>;
}

impl Clone for Box<dyn ErasedRelation> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn boxed<T: AnyRecord>(records: Vec<T>) -> Vec<Box<dyn AnyRecord>> {
    records
        .into_iter()
        .map(|r| Box::new(r) as Box<dyn AnyRecord>)
        .collect()
}

impl<M: ActiveRecord> ActiveQuery<M> {
    /// Load every record of the relation as boxes, skipping indexing.
    fn load_boxed(
        &self,
        db: &dyn ConnectionSource,
    ) -> Result<(Vec<Box<dyn AnyRecord>>, RelationCache), QueryError> {
        let (rows, cache) = self.fetch_rows(db)?;
        if rows.is_empty() {
            return Ok((Vec::new(), cache));
        }
        let records = if self.as_array {
            boxed(self.load_rows(rows, db)?)
        } else {
            boxed(self.load_models(rows, db)?)
        };
        Ok((records, cache))
    }
}

impl<M: ActiveRecord> ErasedRelation for ActiveQuery<M> {
    fn is_multiple(&self) -> bool {
        self.multiple
    }

    fn link(&self) -> &Link {
        &self.link
    }

    fn via(&self) -> &Via {
        &self.via
    }

    fn is_array(&self) -> bool {
        self.as_array
    }

    fn set_as_array(&mut self) {
        self.as_array = true;
        self.index_by = None;
    }

    fn bind_primary(&mut self, primary: Row) {
        ActiveQuery::bind_primary(self, primary);
    }

    fn add_with(&mut self, names: &[String]) {
        self.with.extend(names.iter().cloned());
    }

    fn find_pivot_rows(
        &self,
        primaries: &[Row],
        db: &dyn ConnectionSource,
    ) -> Result<Vec<Row>, QueryError> {
        let mut query = self.clone();
        query.primary_model = None;
        query.filter_by_models(primaries);
        Ok(query.fetch_rows(db)?.0)
    }

    fn resolve(&self, db: &dyn ConnectionSource) -> Result<(Related, RelationCache), QueryError> {
        if self.multiple {
            let (records, cache) = self.load_boxed(db)?;
            return Ok((Related::Many(records), cache));
        }
        let (row, cache) = self.fetch_row(db)?;
        let records = match row {
            None => Vec::new(),
            Some(row) if self.as_array => boxed(self.load_rows(vec![row], db)?),
            Some(row) => boxed(self.load_models(vec![row], db)?),
        };
        Ok((Related::One(records.into_iter().next()), cache))
    }

    fn populate(
        &self,
        name: &str,
        primaries: &mut [&mut dyn AnyRecord],
        db: &dyn ConnectionSource,
    ) -> Result<Vec<Box<dyn AnyRecord>>, QueryError> {
        #[cfg(feature = "tracing")]
        let _span =
            crate::metrics::tracing_helpers::eager_load_span(name, primaries.len()).entered();

        let mut query = self.clone();
        query.primary_model = None;
        let parent_rows: Vec<Row> = primaries.iter().map(|p| p.to_row()).collect();

        // Bucket keys of each parent, and the pivot rows mapping related keys to them.
        let (keys, pivot) = match &self.via {
            Via::Direct => {
                query.filter_by_models(&parent_rows);
                (parent_keys(primaries, &self.link.parent_columns()), None)
            }
            Via::Pivot(pivot) => {
                let rows = pivot.find_pivot_rows(&parent_rows, db)?;
                query.filter_by_models(&rows);
                let keys = parent_keys(primaries, &pivot.link().parent_columns());
                (keys, Some((rows, pivot.link().clone())))
            }
            Via::Named { name: via_name, relation } => {
                relation.populate(via_name, primaries, db)?;
                let via_rows: Vec<Row> = primaries
                    .iter()
                    .flat_map(|p| p.related_rows(via_name))
                    .collect();
                query.filter_by_models(&via_rows);
                (keys_through(primaries, via_name, &self.link.parent_columns()), None)
            }
        };

        let (related, _) = query.load_boxed(db)?;
        let related_rows: Vec<Row> = related.iter().map(|r| r.to_row()).collect();
        let buckets = build_buckets(
            &related_rows,
            &self.link,
            pivot.as_ref().map(|(rows, link)| (rows.as_slice(), link)),
        );
        assign_buckets(name, primaries, &buckets, &related, &keys, self.multiple);
        Ok(related)
    }

    fn clone_box(&self) -> Box<dyn ErasedRelation> {
        Box::new(self.clone())
    }
}
