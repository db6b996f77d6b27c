//! Cross-driver benchmark sweep.
//!
//! This crate provides tools to:
//! - Describe a configuration matrix (driver × workload × tasks × concurrency) in YAML
//! - Launch each driver's benchmark executable once per run
//! - Parse the raw latency report of every run
//! - Aggregate run times and write comparison CSV files

pub mod config;
pub mod runner;

pub use config::{Case, DriverConfig, SweepConfig};
pub use runner::SweepRunner;
