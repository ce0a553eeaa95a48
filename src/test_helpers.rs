//! Test doubles for the storage backend and the diagnostics sink.
//!
//! [`MockExecutor`] replays scripted responses in order and captures every
//! statement it receives, so tests can assert both results and the exact
//! sequence of sub-queries a relation produced.

use crate::connection::Connection;
use crate::diagnostics::Diagnostics;
use crate::document::RawRow;
use crate::executor::{BackendError, Cursor, DocumentExecutor};
use crate::query::Statement;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockResponse {
    Rows(Vec<RawRow>),
    Error(BackendError),
}

/// Executor returning scripted results
///
/// Responses are consumed in order; once they run out every statement
/// returns no rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<MockResponse>>,
    captured: Mutex<Vec<Statement>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one result set; each JSON value becomes one raw row.
    pub fn with_rows(self, rows: Vec<Value>) -> Self {
        self.push(MockResponse::Rows(rows.into_iter().map(RawRow::from_value).collect()));
        self
    }

    pub fn with_raw_rows(self, rows: Vec<RawRow>) -> Self {
        self.push(MockResponse::Rows(rows));
        self
    }

    pub fn with_error(self, message: &str, code: i64) -> Self {
        self.push(MockResponse::Error(BackendError::new(message, code)));
        self
    }

    fn push(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    /// Statements received so far, in execution order.
    pub fn statements(&self) -> Vec<Statement> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn executed(&self) -> usize {
        self.statements().len()
    }

    /// Bound collection name of each executed statement.
    pub fn collections(&self) -> Vec<String> {
        self.statements()
            .iter()
            .map(|s| {
                s.bind_vars()
                    .get("@collection")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            })
            .collect()
    }
}

impl DocumentExecutor for MockExecutor {
    fn execute(&self, statement: &Statement) -> Result<Cursor<'_>, BackendError> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(statement.clone());
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match next {
            Some(MockResponse::Rows(rows)) => Ok(Cursor::from_rows(rows)),
            Some(MockResponse::Error(err)) => Err(err),
            None => Ok(Cursor::from_rows(Vec::new())),
        }
    }
}

/// One recorded diagnostics call
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    Info { token: String, category: String },
    BeginProfile { token: String, category: String },
    EndProfile { token: String, category: String },
}

/// Diagnostics sink that records every call
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, pred: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    fn record(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn info(&self, token: &str, category: &str) {
        self.record(DiagnosticEvent::Info {
            token: token.to_owned(),
            category: category.to_owned(),
        });
    }

    fn begin_profile(&self, token: &str, category: &str) {
        self.record(DiagnosticEvent::BeginProfile {
            token: token.to_owned(),
            category: category.to_owned(),
        });
    }

    fn end_profile(&self, token: &str, category: &str, _elapsed: Duration) {
        self.record(DiagnosticEvent::EndProfile {
            token: token.to_owned(),
            category: category.to_owned(),
        });
    }
}

/// Connection over `executor` with a recording sink.
pub fn mock_connection(executor: Arc<MockExecutor>) -> (Connection, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let connection = Connection::new(executor).with_diagnostics(diagnostics.clone());
    (connection, diagnostics)
}
