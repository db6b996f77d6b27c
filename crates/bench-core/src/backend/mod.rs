//! Database capability consumed by the benchmark.
//!
//! The engine only needs to prepare the two benchmark statements and
//! execute them with int64 parameters. Each backend renders its own
//! statement text.

mod memory;
mod postgres;

pub use memory::MemorySession;
pub use postgres::PostgresSession;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::BenchConfig;
use crate::error::{BackendError, ConfigError};

/// Name of the benchmark table inside the keyspace.
pub const TABLE: &str = "benchtab";

/// The statements issued by the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    /// Insert `(pk, v1, v2)`.
    Insert,
    /// Select `(v1, v2)` by `pk`.
    Select,
}

/// Rows returned by a statement. Every column is an int64.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub rows: Vec<Vec<i64>>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single_row(columns: Vec<i64>) -> Self {
        Self {
            rows: vec![columns],
        }
    }

    /// Column `index` of the first row.
    pub fn column_i64(&self, index: usize) -> Result<i64, BackendError> {
        let row = self.rows.first().ok_or(BackendError::MissingRow)?;
        row.get(index).copied().ok_or(BackendError::MissingColumn {
            index,
            width: row.len(),
        })
    }
}

/// A statement prepared against a backend.
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    async fn execute(&self, params: &[i64]) -> Result<QueryResult, BackendError>;
}

/// A connected database client.
#[async_trait]
pub trait Session: Send + Sync {
    /// Driver name used in reports.
    fn name(&self) -> &str;

    /// Drop and recreate the keyspace and benchmark table.
    async fn setup_schema(&self) -> Result<(), BackendError>;

    async fn prepare(&self, statement: Statement)
        -> Result<Box<dyn PreparedStatement>, BackendError>;
}

/// Backends bundled with the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("memory"),
            BackendKind::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(BackendKind::Memory),
            "postgres" => Ok(BackendKind::Postgres),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

/// Connect a backend for the given configuration.
pub async fn connect(
    kind: BackendKind,
    config: &BenchConfig,
) -> Result<Arc<dyn Session>, BackendError> {
    match kind {
        BackendKind::Memory => Ok(Arc::new(MemorySession::new())),
        BackendKind::Postgres => Ok(Arc::new(PostgresSession::connect(config).await?)),
    }
}
