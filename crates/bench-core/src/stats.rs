//! Per-run latency statistics.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Operation kinds measured by the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Select,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Select => "select",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency statistics for one operation kind, in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub mean_ns: f64,
    /// Population standard deviation.
    pub stddev_ns: f64,
    pub p50_ns: u64,
    pub p99_ns: u64,
    pub max_ns: u64,
}

impl LatencyStats {
    /// Compute statistics over `samples`, or `None` when there are none.
    ///
    /// Mean and standard deviation are exact. Percentiles come from an HDR
    /// histogram with 3 significant digits: the reported value is the
    /// highest value equivalent to the bucket holding the `ceil(q * n)`-th
    /// sample, so it is deterministic and within 0.1% of the nearest rank.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let sum: u128 = samples.iter().map(|&s| s as u128).sum();
        let mean = sum as f64 / n;
        let variance = samples
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut histogram = Histogram::<u64>::new(3).ok()?;
        for &sample in samples {
            histogram.saturating_record(sample);
        }

        Some(Self {
            count: samples.len(),
            mean_ns: mean,
            stddev_ns: variance.sqrt(),
            p50_ns: histogram.value_at_quantile(0.50),
            p99_ns: histogram.value_at_quantile(0.99),
            max_ns: histogram.max(),
        })
    }
}

/// Summary of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub bench_time_ms: u64,
    pub inserts: Option<LatencyStats>,
    pub selects: Option<LatencyStats>,
}

impl RunStats {
    pub fn new(bench_time: Duration, inserts: &[u64], selects: &[u64]) -> Self {
        Self::from_millis(bench_time.as_millis() as u64, inserts, selects)
    }

    pub fn from_millis(bench_time_ms: u64, inserts: &[u64], selects: &[u64]) -> Self {
        Self {
            bench_time_ms,
            inserts: LatencyStats::from_samples(inserts),
            selects: LatencyStats::from_samples(selects),
        }
    }

    pub fn get(&self, kind: OperationKind) -> Option<&LatencyStats> {
        match kind {
            OperationKind::Insert => self.inserts.as_ref(),
            OperationKind::Select => self.selects.as_ref(),
        }
    }
}
