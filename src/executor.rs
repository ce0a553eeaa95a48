//! `DocumentExecutor` module
//!
//! Provides the `DocumentExecutor` trait that abstracts statement execution
//! against the document store, plus [`HttpExecutor`], the implementation that
//! talks to an ArangoDB server over its HTTP cursor API.
//!
//! The query layer only ever sees a [`Cursor`] of [`RawRow`]s, so tests and
//! alternative transports can plug in their own executor.

use crate::config::DatabaseConfig;
use crate::document::RawRow;
use crate::query::Statement;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Error raised by the storage backend.
///
/// `code` is the backend's numeric error code (`errorNum` for ArangoDB), or
/// the HTTP status when the server did not send one. Transport failures use 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub message: String,
    pub code: i64,
}

impl BackendError {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for BackendError {}

/// Rows produced by an executed statement.
///
/// Rows may be pulled lazily (the HTTP executor fetches further batches while
/// the cursor is drained), so reading can fail half way through.
pub struct Cursor<'a> {
    rows: Box<dyn Iterator<Item = Result<RawRow, BackendError>> + 'a>,
}

impl<'a> Cursor<'a> {
    pub fn new<I>(rows: I) -> Self
    where
        I: Iterator<Item = Result<RawRow, BackendError>> + 'a,
    {
        Self {
            rows: Box::new(rows),
        }
    }

    /// Cursor over rows that are already in memory.
    pub fn from_rows(rows: Vec<RawRow>) -> Cursor<'static> {
        Cursor::new(rows.into_iter().map(Ok))
    }

    /// Drain the cursor.
    pub fn get_all(self) -> Result<Vec<RawRow>, BackendError> {
        self.rows.collect()
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<RawRow, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

/// Trait for executing composed statements
///
/// This trait abstracts the storage backend client, allowing the HTTP client,
/// an in-memory mock, or any other transport to be used interchangeably.
///
/// # Examples
///
/// ```no_run
/// use aranguard::{DocumentExecutor, HttpExecutor, DatabaseConfig, Statement};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = HttpExecutor::connect(&DatabaseConfig::default())?;
/// let statement = Statement::new("FOR doc IN posts RETURN doc");
/// let rows = executor.execute(&statement)?.get_all()?;
/// println!("{} rows", rows.len());
/// # Ok(())
/// # }
/// ```
pub trait DocumentExecutor: Send + Sync {
    /// Execute a statement and return a cursor over its result rows
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend rejects or fails the statement.
    fn execute(&self, statement: &Statement) -> Result<Cursor<'_>, BackendError>;
}

#[derive(Debug, Deserialize)]
struct CursorBatch {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "errorNum")]
    error_num: Option<i64>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    jwt: String,
}

/// Implementation of `DocumentExecutor` over the ArangoDB HTTP API
///
/// Statements are sent to `POST /_db/{database}/_api/cursor`; when the server
/// reports more batches, they are fetched with `PUT .../_api/cursor/{id}` as
/// the returned [`Cursor`] is drained.
pub struct HttpExecutor {
    agent: ureq::Agent,
    endpoint: String,
    database: String,
    token: Option<String>,
    batch_size: u32,
}

impl HttpExecutor {
    /// Build an executor from configuration, authenticating when credentials are set.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if authentication fails.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        let mut executor = Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            database: config.database.clone(),
            token: None,
            batch_size: config.batch_size,
        };
        if let Some(username) = &config.username {
            let password = config.password.clone().unwrap_or_default();
            executor.token = Some(executor.authenticate(username, &password)?);
            log::debug!("authenticated against {} as {}", executor.endpoint, username);
        }
        Ok(executor)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<String, BackendError> {
        let url = format!("{}/_open/auth", self.endpoint);
        let response = self
            .agent
            .post(&url)
            .send_json(json!({ "username": username, "password": password }))
            .map_err(map_ureq_error)?;
        let auth: AuthResponse = response
            .into_json()
            .map_err(|e| BackendError::new(format!("invalid auth response: {e}"), 0))?;
        Ok(auth.jwt)
    }

    fn cursor_url(&self) -> String {
        format!("{}/_db/{}/_api/cursor", self.endpoint, self.database)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => request.set("Authorization", &format!("bearer {token}")),
            None => request,
        }
    }

    fn create_cursor(&self, statement: &Statement) -> Result<CursorBatch, BackendError> {
        let body = json!({
            "query": statement.aql(),
            "bindVars": statement.bind_vars(),
            "batchSize": self.batch_size,
        });
        let response = self
            .authorize(self.agent.post(&self.cursor_url()))
            .send_json(body)
            .map_err(map_ureq_error)?;
        read_batch(response)
    }

    fn next_batch(&self, cursor_id: &str) -> Result<CursorBatch, BackendError> {
        let url = format!("{}/{}", self.cursor_url(), cursor_id);
        let response = self
            .authorize(self.agent.put(&url))
            .call()
            .map_err(map_ureq_error)?;
        read_batch(response)
    }
}

impl fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("authenticated", &self.token.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl DocumentExecutor for HttpExecutor {
    fn execute(&self, statement: &Statement) -> Result<Cursor<'_>, BackendError> {
        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::execute_query_span(statement.aql()).entered();

        let batch = self.create_cursor(statement)?;
        Ok(Cursor::new(HttpBatches {
            executor: self,
            buffer: batch.result.into(),
            cursor_id: if batch.has_more { batch.id } else { None },
            failed: false,
        }))
    }
}

/// Iterator pulling batches from a server-side cursor.
struct HttpBatches<'a> {
    executor: &'a HttpExecutor,
    buffer: VecDeque<Value>,
    cursor_id: Option<String>,
    failed: bool,
}

impl Iterator for HttpBatches<'_> {
    type Item = Result<RawRow, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(value) = self.buffer.pop_front() {
                return Some(Ok(RawRow::from_value(value)));
            }
            let cursor_id = self.cursor_id.take()?;
            match self.executor.next_batch(&cursor_id) {
                Ok(batch) => {
                    self.buffer = batch.result.into();
                    if batch.has_more {
                        self.cursor_id = batch.id.or(Some(cursor_id));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn read_batch(response: ureq::Response) -> Result<CursorBatch, BackendError> {
    response
        .into_json()
        .map_err(|e| BackendError::new(format!("invalid cursor response: {e}"), 0))
}

fn map_ureq_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(status, response) => {
            let body: Option<ErrorBody> = response.into_json().ok();
            let (code, message) = match body {
                Some(ErrorBody {
                    error_num,
                    error_message,
                }) => (
                    error_num.unwrap_or(i64::from(status)),
                    error_message.unwrap_or_else(|| format!("HTTP status {status}")),
                ),
                None => (i64::from(status), format!("HTTP status {status}")),
            };
            BackendError::new(message, code)
        }
        ureq::Error::Transport(transport) => BackendError::new(transport.to_string(), 0),
    }
}
