//! Row hydration.
//!
//! Raw cursor rows are unwrapped into plain [`Row`]s, optionally renamed by
//! the select list, turned into models, and finally indexed.

use crate::document::{RawRow, Row};
use crate::model::ActiveRecord;
use crate::query::error::QueryError;
use crate::query::records::{IndexBy, Records};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Unwrap backend documents into plain mappings, keeping row order.
pub fn unwrap_rows(raw: Vec<RawRow>) -> Vec<Row> {
    raw.into_iter().map(RawRow::into_row).collect()
}

/// Rename the fields of `row` by position.
///
/// The n-th field gets the n-th name of `select`. Fields beyond the end of
/// `select` keep their original key, and so does a field whose new name is
/// already taken, so no value is overwritten.
pub fn remap_columns(row: Row, select: &[String]) -> Row {
    let reserved: HashSet<String> = row.keys().skip(select.len()).cloned().collect();
    let mut remapped = Row::with_capacity(row.len());
    for (pos, (key, value)) in row.into_iter().enumerate() {
        let key = match select.get(pos) {
            Some(name) if !reserved.contains(name) && !remapped.contains_key(name) => {
                name.clone()
            }
            _ => key,
        };
        remapped.insert(key, value);
    }
    remapped
}

/// Unwrap and, when a select list is present, remap every row.
pub fn prepare_rows(raw: Vec<RawRow>, select: Option<&[String]>) -> Vec<Row> {
    let rows = unwrap_rows(raw);
    match select {
        Some(columns) if !columns.is_empty() => {
            rows.into_iter().map(|row| remap_columns(row, columns)).collect()
        }
        _ => rows,
    }
}

/// Instantiate one model from a row and mark it as loaded from storage.
pub fn hydrate_model<M: ActiveRecord>(row: Row) -> Result<M, QueryError> {
    let mut model = M::instantiate(row)?;
    model.set_is_new_record(false);
    Ok(model)
}

/// Instantiate a model per row, in row order.
pub fn hydrate_models<M: ActiveRecord>(rows: Vec<Row>) -> Result<Vec<M>, QueryError> {
    rows.into_iter().map(hydrate_model::<M>).collect()
}

/// Key the records when an extractor is set; later duplicates win.
pub fn index_records<T>(records: Vec<T>, index_by: Option<&IndexBy<T>>) -> Records<T> {
    match index_by {
        None => Records::List(records),
        Some(key_of) => {
            let mut map = IndexMap::with_capacity(records.len());
            for record in records {
                map.insert(key_of(&record), record);
            }
            Records::Indexed(map)
        }
    }
}
