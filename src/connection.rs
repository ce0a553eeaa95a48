//! Connection handles.
//!
//! A [`Connection`] pairs an executor with the diagnostics sink that observes
//! it. Queries never look connections up from global state: callers hand them
//! a [`ConnectionSource`], either a single `Connection` (used as is) or a
//! [`ConnectionManager`] that resolves the model's configured connection name.

use crate::config::DatabaseConfig;
use crate::diagnostics::{Diagnostics, LogDiagnostics, ProfileSpan, QUERY_CATEGORY};
use crate::document::RawRow;
use crate::executor::{BackendError, DocumentExecutor, HttpExecutor};
use crate::query::{QueryError, Statement};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name models use unless they override `ActiveRecord::connection_name`.
pub const DEFAULT_CONNECTION: &str = "default";

/// Connection error type
#[derive(Debug)]
pub enum ConnectionError {
    /// Settings could not be loaded
    Config(config::ConfigError),
    /// The server rejected authentication or was unreachable
    Backend(BackendError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Config(e) => write!(f, "Configuration error: {e}"),
            ConnectionError::Backend(e) => write!(f, "Connection error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<config::ConfigError> for ConnectionError {
    fn from(err: config::ConfigError) -> Self {
        ConnectionError::Config(err)
    }
}

impl From<BackendError> for ConnectionError {
    fn from(err: BackendError) -> Self {
        ConnectionError::Backend(err)
    }
}

/// Database handle used by query executors
#[derive(Clone)]
pub struct Connection {
    executor: Arc<dyn DocumentExecutor>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Connection {
    pub fn new(executor: Arc<dyn DocumentExecutor>) -> Self {
        Self {
            executor,
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Connect over HTTP using the given settings.
    pub fn open(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let executor = HttpExecutor::connect(config)?;
        log::info!("connected to {} database {}", config.endpoint, executor.database());
        Ok(Self::new(Arc::new(executor)))
    }

    pub fn diagnostics(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }

    /// Execute a statement and drain its cursor.
    ///
    /// The raw AQL is logged and profiled; the profile block is closed before
    /// any error is returned. Backend failures come back as
    /// [`QueryError::Execution`].
    pub fn fetch_all(&self, statement: &Statement) -> Result<Vec<RawRow>, QueryError> {
        let token = statement.raw_aql();
        self.diagnostics.info(&token, QUERY_CATEGORY);

        let span = ProfileSpan::begin(self.diagnostics.as_ref(), &token, QUERY_CATEGORY);
        let result = self.executor.execute(statement).and_then(|cursor| cursor.get_all());
        span.end();

        result.map_err(|err| {
            log::debug!("statement failed with {}: {}", err.code, err.message);
            #[cfg(feature = "metrics")]
            crate::metrics::METRICS.record_query_error();
            QueryError::from(err)
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Something that can hand out the connection for a model
pub trait ConnectionSource {
    /// Connection registered under `name`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownConnection` if nothing is registered.
    fn connection_for(&self, name: &str) -> Result<&Connection, QueryError>;
}

/// An explicit handle is used whatever the model's configured name.
impl ConnectionSource for Connection {
    fn connection_for(&self, _name: &str) -> Result<&Connection, QueryError> {
        Ok(self)
    }
}

/// Named connections
#[derive(Debug, Default, Clone)]
pub struct ConnectionManager {
    connections: HashMap<String, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` under `name`, replacing any previous one.
    pub fn with_connection(mut self, name: impl Into<String>, connection: Connection) -> Self {
        self.insert(name, connection);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, connection: Connection) {
        self.connections.insert(name.into(), connection);
    }

    pub fn get(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    /// Manager with the default connection opened from `config`.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        Ok(Self::new().with_connection(DEFAULT_CONNECTION, Connection::open(config)?))
    }

    /// Manager built from `DatabaseConfig::load()`.
    pub fn load() -> Result<Self, ConnectionError> {
        Self::from_config(&DatabaseConfig::load()?)
    }
}

impl ConnectionSource for ConnectionManager {
    fn connection_for(&self, name: &str) -> Result<&Connection, QueryError> {
        self.get(name)
            .ok_or_else(|| QueryError::UnknownConnection(name.to_owned()))
    }
}
