//! Sweep scenario loading and management.

use bench_core::Workload;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sweep scenario loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Node list passed to every driver as `--nodes`.
    pub nodes: String,
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Pause between consecutive runs so the database can settle.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub workloads: Vec<Workload>,
    pub tasks: Vec<u64>,
    pub concurrency: Vec<u64>,
    pub drivers: Vec<DriverConfig>,
    /// Extra flags appended to every command line.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// A benchmark executable for one driver implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub name: String,
    /// Shell command that starts the benchmark, without matrix flags.
    pub command: String,
    /// Working directory for the command.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

fn default_runs() -> usize {
    1
}

fn default_pause_secs() -> u64 {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

/// One point of the matrix, run `runs` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub driver: usize,
    pub workload: Workload,
    pub tasks: u64,
    pub concurrency: u64,
}

impl SweepConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: SweepConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runs == 0 {
            anyhow::bail!("runs must be > 0");
        }
        if self.drivers.is_empty() {
            anyhow::bail!("at least one driver must be specified");
        }
        if self.workloads.is_empty() || self.tasks.is_empty() || self.concurrency.is_empty() {
            anyhow::bail!("workloads, tasks and concurrency must not be empty");
        }
        if self.tasks.contains(&0) || self.concurrency.contains(&0) {
            anyhow::bail!("tasks and concurrency values must be > 0");
        }
        Ok(())
    }

    /// Matrix in execution order: every driver runs its whole matrix
    /// before the next driver starts.
    pub fn cases(&self) -> Vec<Case> {
        let mut cases = Vec::new();
        for driver in 0..self.drivers.len() {
            for &workload in &self.workloads {
                for &tasks in &self.tasks {
                    for &concurrency in &self.concurrency {
                        cases.push(Case {
                            driver,
                            workload,
                            tasks,
                            concurrency,
                        });
                    }
                }
            }
        }
        cases
    }

    pub fn total_runs(&self) -> u64 {
        (self.cases().len() * self.runs) as u64
    }

    /// Path of the CSV written at the end of the sweep.
    pub fn csv_path(&self) -> PathBuf {
        let file_name = self.name.replace(' ', "_").to_lowercase();
        self.output_dir.join(format!("{}.csv", file_name))
    }
}
