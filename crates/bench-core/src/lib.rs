//! Load generation and measurement engine for database driver benchmarks.
//!
//! This crate provides:
//! - A lock-free batch cursor that hands out disjoint key ranges to workers
//! - Bernoulli latency sampling with memory bounded by the sample target
//! - A worker pool that drives inserts and point lookups against a pluggable backend
//! - Per-run latency statistics and cross-run wall-clock statistics
//! - Report output in the raw line protocol, report lines, CSV and tables

pub mod backend;
pub mod config;
pub mod cursor;
pub mod error;
pub mod report;
pub mod results;
pub mod runner;
pub mod sampler;
pub mod stats;
pub mod worker;

pub use backend::{connect, BackendKind, PreparedStatement, QueryResult, Session, Statement};
pub use config::{BenchConfig, Workload};
pub use cursor::{Batch, BatchCursor};
pub use error::{BackendError, BenchError, ConfigError, ReportError, Result};
pub use report::{CsvRecord, RawReport, ReportLine};
pub use results::{BenchResult, RunSummary};
pub use runner::{BenchRunner, RunOutcome};
pub use sampler::{LatencySampler, SampleSet};
pub use stats::{LatencyStats, OperationKind, RunStats};
