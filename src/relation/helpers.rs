//! Key helpers shared by lazy and eager relation resolution.

use crate::document::Row;
use crate::query::records::key_string;
use crate::query::Condition;
use crate::relation::def::Link;
use serde_json::Value;
use std::collections::HashSet;

/// Bucket keys of `row` for the given link columns.
///
/// A single column yields one key per value, with array values flattened
/// and `null` skipped. Several columns yield one composite key, or none
/// when any of them is `null` or missing.
pub fn link_keys(row: &Row, columns: &[&str]) -> Vec<String> {
    match columns {
        [] => Vec::new(),
        [column] => match row.get(*column) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(key_string)
                .collect(),
            Some(value) => vec![key_string(value)],
        },
        _ => {
            let mut parts = Vec::with_capacity(columns.len());
            for column in columns {
                match row.get(*column) {
                    None | Some(Value::Null) => return Vec::new(),
                    Some(value) => parts.push(Value::String(key_string(value))),
                }
            }
            vec![Value::Array(parts).to_string()]
        }
    }
}

/// Distinct values of `column` over `rows`, first occurrence first.
///
/// `null` is skipped and array values are flattened.
pub fn collect_values(rows: &[Row], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    let mut push = |value: &Value| {
        if !value.is_null() && seen.insert(value.to_string()) {
            values.push(value.clone());
        }
    };
    for row in rows {
        match row.get(column) {
            Some(Value::Array(items)) => items.iter().for_each(&mut push),
            Some(value) => push(value),
            None => {}
        }
    }
    values
}

/// Distinct value tuples of `columns` over `rows`; tuples with a `null` are skipped.
pub fn collect_tuples(rows: &[Row], columns: &[&str]) -> Vec<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut tuples = Vec::new();
    for row in rows {
        let tuple: Option<Vec<Value>> = columns
            .iter()
            .map(|c| row.get(*c).filter(|v| !v.is_null()).cloned())
            .collect();
        if let Some(tuple) = tuple {
            if seen.insert(Value::Array(tuple.clone()).to_string()) {
                tuples.push(tuple);
            }
        }
    }
    tuples
}

/// Filter selecting the records linked to `rows`.
///
/// `None` when the rows carry no usable key, meaning nothing can match.
pub fn link_condition(link: &Link, rows: &[Row]) -> Option<Condition> {
    let related = link.related_columns();
    let parent = link.parent_columns();
    match (related.as_slice(), parent.as_slice()) {
        ([], _) => None,
        ([related], [parent]) => {
            let values = collect_values(rows, parent);
            (!values.is_empty()).then(|| Condition::is_in(*related, values))
        }
        _ => {
            let tuples = collect_tuples(rows, &parent);
            (!tuples.is_empty()).then(|| {
                Condition::in_tuples(related.iter().map(|c| (*c).to_owned()).collect(), tuples)
            })
        }
    }
}
