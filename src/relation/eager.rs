//! Eager loading for related records.
//!
//! Relations named in `with(...)` are resolved once for the whole result set
//! instead of once per record:
//! 1. Collect the link keys of every parent record
//! 2. Fetch all related records with one `IN` filter (through the pivot
//!    rows or the via relation's records when the relation has one)
//! 3. Group the related records into buckets by link key
//! 4. Attach each parent's bucket under the relation name
//!
//! Dotted names (`posts.comments`) load `posts` and then `comments` on the
//! loaded posts.

use crate::connection::ConnectionSource;
use crate::document::Row;
use crate::model::{ActiveRecord, AnyRecord};
use crate::query::QueryError;
use crate::relation::cache::Related;
use crate::relation::def::Link;
use crate::relation::helpers::link_keys;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Group relation names by their first segment.
///
/// `["posts.comments", "author", "posts.tags"]` becomes
/// `{"posts": ["comments", "tags"], "author": []}`, in first-seen order.
pub fn normalize_relations(names: &[String]) -> IndexMap<String, Vec<String>> {
    let mut normalized: IndexMap<String, Vec<String>> = IndexMap::new();
    for name in names {
        match name.split_once('.') {
            Some((head, rest)) => normalized
                .entry(head.to_owned())
                .or_default()
                .push(rest.to_owned()),
            None => {
                normalized.entry(name.clone()).or_default();
            }
        }
    }
    normalized
}

/// Load the relations in `names` onto `records`, which are records of `M`.
///
/// Relations are looked up with `M::relation`; when `as_array` is set they
/// return plain rows, which is what array-mode parents expect.
///
/// # Errors
///
/// Returns `QueryError::UnknownRelation` for a name `M` does not declare, and
/// any error raised while resolving a relation.
pub fn find_with<M: ActiveRecord>(
    names: &[String],
    records: &mut [&mut dyn AnyRecord],
    as_array: bool,
    db: &dyn ConnectionSource,
) -> Result<(), QueryError> {
    if records.is_empty() {
        return Ok(());
    }
    for (name, nested) in normalize_relations(names) {
        let mut relation = M::relation(&name).ok_or_else(|| QueryError::UnknownRelation {
            model: M::collection_name(),
            relation: name.clone(),
        })?;
        if as_array {
            relation.set_as_array();
        }
        relation.add_with(&nested);
        let loaded = relation.populate(&name, records, db)?;
        log::debug!(
            "eager loaded {} {} record(s) for {} {}",
            loaded.len(),
            name,
            records.len(),
            M::collection_name()
        );
    }
    Ok(())
}

/// Buckets of related record positions keyed by parent link key.
///
/// Without via rows a related record lands in the bucket of its own link
/// key. With via rows, each row maps a related key (the link's parent
/// columns) to a parent key (the via link's related columns); a record
/// reached through several rows is kept once per parent.
pub(crate) fn build_buckets(
    related: &[Row],
    link: &Link,
    via: Option<(&[Row], &Link)>,
) -> HashMap<String, Vec<usize>> {
    let related_columns = link.related_columns();
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, row) in related.iter().enumerate() {
        for key in link_keys(row, &related_columns) {
            by_key.entry(key).or_default().push(pos);
        }
    }

    let Some((via_rows, via_link)) = via else {
        return by_key;
    };

    let child_columns = link.parent_columns();
    let parent_columns = via_link.related_columns();
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    for via_row in via_rows {
        let parents = link_keys(via_row, &parent_columns);
        for child in link_keys(via_row, &child_columns) {
            let Some(positions) = by_key.get(&child) else {
                continue;
            };
            for parent in &parents {
                let bucket = buckets.entry(parent.clone()).or_default();
                for pos in positions {
                    if !bucket.contains(pos) {
                        bucket.push(*pos);
                    }
                }
            }
        }
    }
    buckets
}

/// Link keys of each parent's own columns, in parent order.
pub(crate) fn parent_keys(primaries: &[&mut dyn AnyRecord], columns: &[&str]) -> Vec<Vec<String>> {
    primaries
        .iter()
        .map(|primary| link_keys(&primary.to_row(), columns))
        .collect()
}

/// Link keys reached from each parent through the records attached to it
/// under `via_name`, in parent order.
pub(crate) fn keys_through(
    primaries: &[&mut dyn AnyRecord],
    via_name: &str,
    columns: &[&str],
) -> Vec<Vec<String>> {
    primaries
        .iter()
        .map(|primary| {
            primary
                .related_rows(via_name)
                .iter()
                .flat_map(|row| link_keys(row, columns))
                .collect()
        })
        .collect()
}

/// Attach each parent's buckets as `Many`, or the first entry as `One`.
///
/// `keys[i]` are the bucket keys of `primaries[i]`.
pub(crate) fn assign_buckets(
    name: &str,
    primaries: &mut [&mut dyn AnyRecord],
    buckets: &HashMap<String, Vec<usize>>,
    related: &[Box<dyn AnyRecord>],
    keys: &[Vec<String>],
    multiple: bool,
) {
    for (primary, keys) in primaries.iter_mut().zip(keys) {
        let mut seen = HashSet::new();
        let mut items: Vec<Box<dyn AnyRecord>> = Vec::new();
        for key in keys {
            for pos in buckets.get(key).into_iter().flatten() {
                if seen.insert(*pos) {
                    items.push(related[*pos].clone_record());
                }
            }
        }
        let result = if multiple {
            Related::Many(items)
        } else {
            Related::One(items.into_iter().next())
        };
        primary.attach_related(name, result);
    }
}
