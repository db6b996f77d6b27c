//! Benchmark configuration and validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::sampler::DEFAULT_SAMPLE_TARGET;

/// Largest task count for which `3 * pk` still fits in a BIGINT column.
pub const MAX_TASKS: u64 = (i64::MAX / 3) as u64;

/// Operation mix issued per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    Inserts,
    Selects,
    Mixed,
}

impl Workload {
    pub fn has_inserts(self) -> bool {
        matches!(self, Workload::Inserts | Workload::Mixed)
    }

    pub fn has_selects(self) -> bool {
        matches!(self, Workload::Selects | Workload::Mixed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Workload::Inserts => "inserts",
            Workload::Selects => "selects",
            Workload::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workload {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inserts" => Ok(Workload::Inserts),
            "selects" => Ok(Workload::Selects),
            "mixed" => Ok(Workload::Mixed),
            other => Err(ConfigError::InvalidWorkload(other.to_string())),
        }
    }
}

/// Parameters of one benchmark invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub nodes: Vec<String>,
    #[serde(default = "default_credential")]
    pub user: String,
    #[serde(default = "default_credential", skip_serializing)]
    pub password: String,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    pub workload: Workload,
    pub tasks: u64,
    pub concurrency: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Skip schema provisioning and select pre-seeding.
    #[serde(default)]
    pub dont_prepare: bool,
    /// Issue the tasks of a batch concurrently instead of one by one.
    #[serde(default)]
    pub async_mode: bool,
    /// Emit per-worker span timings.
    #[serde(default)]
    pub profile: bool,
    #[serde(default = "default_sample_target")]
    pub sample_target: u64,
    /// Minimum number of workers used to seed data for the selects workload.
    #[serde(default = "default_seed_concurrency")]
    pub seed_concurrency: u64,
    /// RNG seed for reproducible sampling decisions.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_credential() -> String {
    "cassandra".to_string()
}

fn default_keyspace() -> String {
    "benchks".to_string()
}

fn default_batch_size() -> u64 {
    256
}

fn default_sample_target() -> u64 {
    DEFAULT_SAMPLE_TARGET
}

fn default_seed_concurrency() -> u64 {
    1024
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["127.0.0.1:5432".to_string()],
            user: default_credential(),
            password: default_credential(),
            keyspace: default_keyspace(),
            workload: Workload::Mixed,
            tasks: 1_000_000,
            concurrency: 1024,
            batch_size: default_batch_size(),
            dont_prepare: false,
            async_mode: false,
            profile: false,
            sample_target: default_sample_target(),
            seed_concurrency: default_seed_concurrency(),
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Validate the configuration and clamp the batch size.
    ///
    /// When there are fewer batches than workers the batch size shrinks to
    /// `max(1, tasks / concurrency)` so every worker can get a batch.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if !is_identifier(&self.keyspace) {
            return Err(ConfigError::InvalidKeyspace(self.keyspace));
        }
        if self.tasks == 0 {
            return Err(ConfigError::NotPositive { field: "tasks" });
        }
        if self.tasks > MAX_TASKS {
            return Err(ConfigError::TooManyTasks {
                tasks: self.tasks,
                max: MAX_TASKS,
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::NotPositive {
                field: "concurrency",
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "batch_size",
            });
        }

        if self.tasks / self.batch_size < self.concurrency {
            self.batch_size = (self.tasks / self.concurrency).max(1);
        }

        Ok(self)
    }

    /// Worker count for the insert pass that seeds the selects workload.
    pub fn seeding_workers(&self) -> u64 {
        self.seed_concurrency.max(self.concurrency)
    }
}

/// The keyspace is spliced into DDL, so only plain identifiers are allowed.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
