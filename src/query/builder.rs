//! Base query and AQL statement building.
//!
//! [`Query`] carries everything that is independent of models and relations:
//! target collection, select list, filters, sort, and pagination. It renders
//! into a [`Statement`], the unit handed to a
//! [`DocumentExecutor`](crate::DocumentExecutor).

use crate::document::Row;
use crate::query::condition::{attribute_ref, BindVars, Condition, Order};
use serde_json::Value;

const LOOP_VAR: &str = "doc";
const COLLECTION_BIND: &str = "@collection";

/// Composed AQL text with its bind variables
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    aql: String,
    bind_vars: Row,
}

impl Statement {
    pub fn new(aql: impl Into<String>) -> Self {
        Self {
            aql: aql.into(),
            bind_vars: Row::new(),
        }
    }

    pub fn with_bind_vars(aql: impl Into<String>, bind_vars: Row) -> Self {
        Self {
            aql: aql.into(),
            bind_vars,
        }
    }

    pub fn aql(&self) -> &str {
        &self.aql
    }

    pub fn bind_vars(&self) -> &Row {
        &self.bind_vars
    }

    /// AQL with bind variables inlined, used as the diagnostic token.
    ///
    /// Collection binds (`@@name`) are inlined as quoted names, value binds as
    /// JSON literals. Unknown bind names are left untouched.
    pub fn raw_aql(&self) -> String {
        let mut out = String::with_capacity(self.aql.len());
        let mut chars = self.aql.char_indices().peekable();
        while let Some((start, ch)) = chars.next() {
            if ch != '@' {
                out.push(ch);
                continue;
            }
            let is_collection = matches!(chars.peek(), Some((_, '@')));
            if is_collection {
                chars.next();
            }
            let mut name = String::new();
            while let Some((_, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || *next == '_' {
                    name.push(*next);
                    chars.next();
                } else {
                    break;
                }
            }
            let lookup = if is_collection { format!("@{name}") } else { name.clone() };
            match self.bind_vars.get(&lookup) {
                Some(Value::String(collection)) if is_collection => {
                    out.push('`');
                    out.push_str(collection);
                    out.push('`');
                }
                Some(value) if !is_collection => out.push_str(&value.to_string()),
                _ => {
                    let end = start + if is_collection { 2 } else { 1 } + name.len();
                    out.push_str(&self.aql[start..end]);
                }
            }
        }
        out
    }
}

/// Base query against one collection
///
/// Builder methods consume and return the query, like the rest of the crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) from: Option<String>,
    pub(crate) select: Option<Vec<String>>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) order_by: Vec<(String, Order)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) emulate_execution: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target collection, overriding the model's own.
    pub fn from(mut self, collection: impl Into<String>) -> Self {
        self.from = Some(collection.into());
        self
    }

    /// Positional select list; rows come back as tuples renamed by this list.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.and_where(condition);
        self
    }

    pub(crate) fn and_where(&mut self, condition: Condition) {
        if !condition.is_empty() {
            self.conditions.push(condition);
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Short-circuit execution: no statement reaches the backend and every
    /// executor returns its empty result.
    pub fn emulate_execution(mut self) -> Self {
        self.emulate_execution = true;
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn select_list(&self) -> Option<&[String]> {
        self.select.as_deref()
    }

    pub fn is_emulated(&self) -> bool {
        self.emulate_execution
    }

    pub(crate) fn collection_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(default)
    }

    fn render_head(&self, collection: &str, binds: &mut BindVars) -> (Vec<String>, Row) {
        let mut lines = vec![format!("FOR {LOOP_VAR} IN @{COLLECTION_BIND}")];
        for condition in &self.conditions {
            lines.push(format!("FILTER {}", condition.render(LOOP_VAR, binds)));
        }
        let mut collection_bind = Row::new();
        collection_bind.insert(COLLECTION_BIND.to_owned(), Value::String(collection.to_owned()));
        (lines, collection_bind)
    }

    fn finish(lines: Vec<String>, collection_bind: Row, binds: BindVars) -> Statement {
        let mut bind_vars = collection_bind;
        bind_vars.extend(binds.into_pairs());
        Statement::with_bind_vars(lines.join("\n"), bind_vars)
    }

    /// Statement returning the matching documents (or the select projection).
    pub fn build(&self, collection: &str) -> Statement {
        self.build_with_limit(collection, self.limit)
    }

    /// Statement for a single row: same as [`build`](Self::build) capped at one.
    pub fn build_one(&self, collection: &str) -> Statement {
        self.build_with_limit(collection, Some(1))
    }

    fn build_with_limit(&self, collection: &str, limit: Option<u64>) -> Statement {
        let mut binds = BindVars::default();
        let (mut lines, collection_bind) =
            self.render_head(self.collection_or(collection), &mut binds);

        if !self.order_by.is_empty() {
            let sorts: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, order)| {
                    format!("{} {}", attribute_ref(LOOP_VAR, field), order.as_aql())
                })
                .collect();
            lines.push(format!("SORT {}", sorts.join(", ")));
        }

        match (self.offset, limit) {
            (None, None) => {}
            (offset, Some(count)) => {
                lines.push(format!("LIMIT {}, {}", offset.unwrap_or(0), count))
            }
            (Some(offset), None) => lines.push(format!("LIMIT {}, {}", offset, i64::MAX)),
        }

        lines.push(match &self.select {
            Some(columns) if !columns.is_empty() => {
                let refs: Vec<String> =
                    columns.iter().map(|c| attribute_ref(LOOP_VAR, c)).collect();
                format!("RETURN [{}]", refs.join(", "))
            }
            _ => format!("RETURN {LOOP_VAR}"),
        });

        Self::finish(lines, collection_bind, binds)
    }

    /// Statement counting matches; sort and pagination do not affect a count.
    pub fn build_count(&self, collection: &str) -> Statement {
        let mut binds = BindVars::default();
        let (mut lines, collection_bind) =
            self.render_head(self.collection_or(collection), &mut binds);
        lines.push("COLLECT WITH COUNT INTO length".to_owned());
        lines.push("RETURN length".to_owned());
        Self::finish(lines, collection_bind, binds)
    }

    /// Statement returning at most one marker row when anything matches.
    pub fn build_exists(&self, collection: &str) -> Statement {
        let mut binds = BindVars::default();
        let (mut lines, collection_bind) =
            self.render_head(self.collection_or(collection), &mut binds);
        lines.push("LIMIT 1".to_owned());
        lines.push("RETURN 1".to_owned());
        Self::finish(lines, collection_bind, binds)
    }
}
