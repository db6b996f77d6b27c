//! Common benchmark configurations for tests.

use bench_core::{BenchConfig, Workload};

/// Validated configuration with a small domain and a tiny sample target.
pub fn small_config(workload: Workload, tasks: u64, concurrency: u64, batch_size: u64) -> BenchConfig {
    BenchConfig {
        nodes: vec!["memory".to_string()],
        workload,
        tasks,
        concurrency,
        batch_size,
        sample_target: 10,
        seed_concurrency: 4,
        seed: Some(7),
        ..Default::default()
    }
    .validate()
    .expect("fixture config must be valid")
}

/// The end-to-end scenario: 100 tasks, 4 workers, batches of 25.
pub fn mixed_100x4() -> BenchConfig {
    small_config(Workload::Mixed, 100, 4, 25)
}

/// Run times used by cross-run aggregation tests, in milliseconds.
pub const RUN_TIMES_MS: [u64; 5] = [1010, 990, 1005, 995, 1000];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_fixture_keeps_batch_size() {
        let config = mixed_100x4();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.workload, Workload::Mixed);
    }
}
