//! Error types for benchmark runs.

use thiserror::Error;

use crate::stats::OperationKind;

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Invalid benchmark configuration. Always fatal before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid workload type: {0} (expected inserts, selects or mixed)")]
    InvalidWorkload(String),

    #[error("invalid backend: {0} (expected memory or postgres)")]
    InvalidBackend(String),

    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },

    #[error("tasks must be <= {max}, got {tasks}")]
    TooManyTasks { tasks: u64, max: u64 },

    #[error("at least one node address is required")]
    NoNodes,

    #[error("invalid keyspace name: {0:?} (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidKeyspace(String),
}

/// Failure reported by a database backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("statement execution failed: {0}")]
    Execution(String),

    #[error("query returned no rows")]
    MissingRow,

    #[error("column {index} not present in result with {width} columns")]
    MissingColumn { index: usize, width: usize },

    #[error("failed to decode column: {0}")]
    Decode(String),
}

/// Primary error type for a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Schema provisioning or statement preparation failed.
    #[error("setup failed: {0}")]
    Setup(#[source] BackendError),

    #[error("{op} failed for pk {pk}: {source}")]
    Backend {
        op: OperationKind,
        pk: i64,
        #[source]
        source: BackendError,
    },

    /// A select returned values that do not match what was inserted.
    #[error("correctness violation for pk {pk}: expected {expected:?}, got {actual:?}")]
    Mismatch {
        pk: i64,
        expected: (i64, i64),
        actual: (i64, i64),
    },

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("sample channel closed before the run finished")]
    SampleChannelClosed,
}

impl BenchError {
    /// Whether the error indicates wrong data rather than a failed operation.
    pub fn is_correctness_violation(&self) -> bool {
        matches!(self, BenchError::Mismatch { .. })
    }
}

/// Errors while rendering or parsing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: invalid value '{value}' for '{tag}'")]
    Parse {
        line: usize,
        tag: String,
        value: String,
    },

    #[error("report has no 'time' line")]
    MissingTime,

    #[error("no runs recorded for {0}")]
    NoRuns(String),
}
