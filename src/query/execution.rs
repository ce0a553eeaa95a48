//! Execution methods for the base [`Query`].
//!
//! These run a query against one collection through a [`Connection`] and
//! return raw rows or scalars. Model hydration and relation handling live in
//! [`ActiveQuery`](crate::ActiveQuery), which delegates here.
//!
//! A query switched to emulated execution never reaches the backend: `all`
//! returns no rows, `one` returns `None`, `count` returns `0` and `exists`
//! returns `false`.

use crate::connection::Connection;
use crate::document::RawRow;
use crate::query::builder::Query;
use crate::query::error::QueryError;
use serde_json::Value;

impl Query {
    /// Execute the query and return every raw row.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use aranguard::{Condition, Connection, DatabaseConfig, Query};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let conn = Connection::open(&DatabaseConfig::default())?;
    /// let rows = Query::new()
    ///     .filter(Condition::eq("status", "published"))
    ///     .all(&conn, "posts")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn all(&self, conn: &Connection, collection: &str) -> Result<Vec<RawRow>, QueryError> {
        if self.emulate_execution {
            return Ok(Vec::new());
        }
        conn.fetch_all(&self.build(collection))
    }

    /// Execute the query capped at one row.
    ///
    /// `Ok(None)` means nothing matched; errors are reported separately.
    pub fn one(&self, conn: &Connection, collection: &str) -> Result<Option<RawRow>, QueryError> {
        if self.emulate_execution {
            return Ok(None);
        }
        Ok(conn.fetch_all(&self.build_one(collection))?.into_iter().next())
    }

    /// Number of matching documents.
    pub fn count(&self, conn: &Connection, collection: &str) -> Result<u64, QueryError> {
        if self.emulate_execution {
            return Ok(0);
        }
        let rows = conn.fetch_all(&self.build_count(collection))?;
        match rows.into_iter().next() {
            None => Ok(0),
            Some(RawRow::Scalar(Value::Number(n))) => n.as_u64().ok_or_else(|| {
                QueryError::UnexpectedResult(format!("count is not a non-negative integer: {n}"))
            }),
            Some(other) => Err(QueryError::UnexpectedResult(format!(
                "count returned {}",
                other.into_value()
            ))),
        }
    }

    /// Whether at least one document matches.
    pub fn exists(&self, conn: &Connection, collection: &str) -> Result<bool, QueryError> {
        if self.emulate_execution {
            return Ok(false);
        }
        Ok(!conn.fetch_all(&self.build_exists(collection))?.is_empty())
    }
}
