//! Wall-clock statistics across repeated runs of one configuration.

use serde::{Deserialize, Serialize};

use crate::config::Workload;

/// Mean and population standard deviation of run times, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub runs: usize,
    pub mean_ms: f64,
    pub stddev_ms: f64,
}

/// Run times of one (driver, workload, tasks, concurrency) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub driver: String,
    pub workload: Workload,
    pub tasks: u64,
    pub concurrency: u64,
    times_ms: Vec<u64>,
}

impl BenchResult {
    pub fn new(driver: impl Into<String>, workload: Workload, tasks: u64, concurrency: u64) -> Self {
        Self {
            driver: driver.into(),
            workload,
            tasks,
            concurrency,
            times_ms: Vec::new(),
        }
    }

    /// Append the wall-clock time of one run.
    pub fn record(&mut self, bench_time_ms: u64) {
        self.times_ms.push(bench_time_ms);
    }

    pub fn times_ms(&self) -> &[u64] {
        &self.times_ms
    }

    /// Label used in logs and error messages.
    pub fn label(&self) -> String {
        format!(
            "{} {} tasks={} concurrency={}",
            self.driver, self.workload, self.tasks, self.concurrency
        )
    }

    /// Summary over the recorded runs, `None` before the first run.
    ///
    /// The mean is a floating-point mean of the millisecond times; a single
    /// run has a standard deviation of 0.
    pub fn summary(&self) -> Option<RunSummary> {
        if self.times_ms.is_empty() {
            return None;
        }

        let n = self.times_ms.len() as f64;
        let mean = self.times_ms.iter().map(|&t| t as f64).sum::<f64>() / n;
        let variance = self
            .times_ms
            .iter()
            .map(|&t| (t as f64 - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(RunSummary {
            runs: self.times_ms.len(),
            mean_ms: mean,
            stddev_ms: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_runs_has_no_summary() {
        let result = BenchResult::new("memory", Workload::Mixed, 100, 4);
        assert!(result.summary().is_none());
    }

    #[test]
    fn test_single_run_has_zero_stddev() {
        let mut result = BenchResult::new("memory", Workload::Mixed, 100, 4);
        result.record(1234);
        let summary = result.summary().unwrap();
        assert_eq!(summary.runs, 1);
        assert_eq!(summary.mean_ms, 1234.0);
        assert_eq!(summary.stddev_ms, 0.0);
    }

    #[test]
    fn test_mean_and_stddev_across_runs() {
        let mut result = BenchResult::new("postgres", Workload::Inserts, 1_000_000, 1024);
        for t in [100, 200, 300, 400] {
            result.record(t);
        }
        let summary = result.summary().unwrap();
        assert_eq!(summary.mean_ms, 250.0);
        assert!((summary.stddev_ms - 125.0_f64.sqrt() * 10.0).abs() < 1e-9);
        assert_eq!(result.label(), "postgres inserts tasks=1000000 concurrency=1024");
    }
}
