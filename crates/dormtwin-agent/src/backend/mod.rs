//! Query backends: the graph store and the time-series store.
//!
//! The planner only sees the [`QueryBackend`] trait. Both stores are
//! read-only by contract, and that contract is enforced upstream by the
//! validator, not here.
//!
//! Sub-modules:
//!   - `neo4j`:    Neo4j HTTP transactional endpoint
//!   - `influx`:   InfluxDB 3 SQL endpoint
//!   - `sanitize`: strips credentials from error text before it reaches the model

mod influx;
mod neo4j;
pub mod sanitize;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use influx::InfluxSqlBackend;
pub use neo4j::Neo4jHttpBackend;

/// Which store a tool targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Graph,
    Series,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Graph => "graph",
            Backend::Series => "series",
        })
    }
}

/// Rows as returned by a backend, before normalization. `columns` keeps the
/// backend's declared order and each row is positional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Backend failures. All of them are recoverable from the planner's point of
/// view: they are reported back into the conversation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend reachable, query failed (syntax error, unknown table, ...).
    #[error("backend execution error: {0}")]
    Execution(String),

    /// Connection refused, DNS failure, TLS failure.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timeout after {0:?}")]
    Timeout(Duration),

    /// Backend answered with something we could not interpret.
    #[error("backend protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Generic category shown to the model alongside the sanitized fragment.
    pub fn category(&self) -> &'static str {
        match self {
            BackendError::Execution(_) => "backend execution error",
            BackendError::Unavailable(_) => "backend unavailable",
            BackendError::Timeout(_) => "backend timeout",
            BackendError::Protocol(_) => "backend protocol error",
        }
    }

    /// Raw backend-provided detail (unsanitized).
    pub fn detail(&self) -> String {
        match self {
            BackendError::Execution(m) | BackendError::Unavailable(m) | BackendError::Protocol(m) => {
                m.clone()
            }
            BackendError::Timeout(d) => format!("no response within {}s", d.as_secs()),
        }
    }

    /// Map a transport error from reqwest. reqwest's message names the
    /// endpoint URL, so only a fixed description is kept; the full error
    /// goes to the debug log.
    pub(crate) fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        tracing::debug!(error = %err, "Backend transport error");
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else if err.is_connect() {
            BackendError::Unavailable("connection failed".to_string())
        } else if err.is_request() {
            BackendError::Unavailable("request could not be sent".to_string())
        } else if err.is_decode() {
            BackendError::Protocol("response body could not be decoded".to_string())
        } else if err.is_body() {
            BackendError::Protocol("response body could not be read".to_string())
        } else {
            BackendError::Execution("request failed".to_string())
        }
    }
}

/// A store that executes query text and returns rows.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    fn kind(&self) -> Backend;

    async fn execute(&self, query: &str) -> Result<RawResultSet, BackendError>;

    /// Connectivity check with the dialect's trivial read.
    async fn ping(&self) -> Result<(), BackendError> {
        let trivial = match self.kind() {
            Backend::Graph => "RETURN 1 AS num",
            Backend::Series => "SELECT 1",
        };
        self.execute(trivial).await.map(|_| ())
    }
}

/// Shared HTTP client construction for both adapters.
pub(crate) fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build backend HTTP client")
}
