//! Error type for query composition, execution, and hydration.

use crate::executor::BackendError;
use std::fmt;

/// Error returned by every query operation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The backend failed while executing a statement.
    ///
    /// Whatever the backend-specific failure, callers see this one variant
    /// with the original message and numeric code.
    Execution {
        message: String,
        code: i64,
        source: BackendError,
    },
    /// A row could not be turned into a model
    Hydration { model: &'static str, message: String },
    /// A relation name not declared by the model
    UnknownRelation { model: &'static str, relation: String },
    /// No connection registered under this name
    UnknownConnection(String),
    /// The backend returned something the executor cannot interpret
    UnexpectedResult(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Execution { message, code, .. } => {
                write!(f, "Query execution failed ({code}): {message}")
            }
            QueryError::Hydration { model, message } => {
                write!(f, "Failed to hydrate {model}: {message}")
            }
            QueryError::UnknownRelation { model, relation } => {
                write!(f, "{model} has no relation named \"{relation}\"")
            }
            QueryError::UnknownConnection(name) => {
                write!(f, "No connection named \"{name}\"")
            }
            QueryError::UnexpectedResult(msg) => {
                write!(f, "Unexpected result: {msg}")
            }
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<BackendError> for QueryError {
    fn from(err: BackendError) -> Self {
        QueryError::Execution {
            message: err.message.clone(),
            code: err.code,
            source: err,
        }
    }
}
