//! End-to-end runs of the worker pool against test sessions.

use bench_core::backend::MemorySession;
use bench_core::{
    BenchError, BenchResult, BenchRunner, OperationKind, RawReport, Workload,
};
use std::sync::Arc;
use test_utils::{assert_approx_eq, mixed_100x4, small_config, CountingSession, Fault, FaultySession};

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_mixed_end_to_end() {
    let session = Arc::new(CountingSession::new());
    let mut config = mixed_100x4();
    config.sample_target = 1000;
    let runner = BenchRunner::new(session.clone(), config);

    runner.prepare().await.unwrap();
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome.batches, 4);
    assert_eq!(outcome.tasks, 100);

    session.with_counts(|counts| {
        assert_eq!(counts.inserts.len(), 100);
        assert_eq!(counts.selects.len(), 100);
        assert!(counts.inserts.values().all(|&n| n == 1));
        assert!(counts.selects.values().all(|&n| n == 1));
        // One insert and one select statement per worker.
        assert_eq!(counts.prepares, 8);
    });

    let stats = outcome.stats();
    assert!(stats.inserts.as_ref().is_some_and(|s| s.count > 0));
    assert!(stats.selects.as_ref().is_some_and(|s| s.count > 0));

    let mut result = BenchResult::new("counting", Workload::Mixed, 100, 4);
    result.record(stats.bench_time_ms);
    let summary = result.summary().unwrap();
    assert_eq!(summary.stddev_ms, 0.0);
}

#[tokio::test]
async fn test_inserts_only_have_no_select_samples() {
    let session = Arc::new(CountingSession::new());
    let runner = BenchRunner::new(session.clone(), small_config(Workload::Inserts, 1000, 8, 16));

    runner.prepare().await.unwrap();
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome.tasks, 1000);
    assert!(outcome.selects.is_empty());
    assert!(outcome.stats().selects.is_none());
    session.with_counts(|counts| {
        assert_eq!(counts.inserts.len(), 1000);
        assert!(counts.selects.is_empty());
    });
}

#[tokio::test]
async fn test_sample_count_bounded_by_capacity() {
    let session = Arc::new(MemorySession::new());
    let runner = BenchRunner::new(session, small_config(Workload::Inserts, 5000, 4, 50));

    runner.prepare().await.unwrap();
    let outcome = runner.run().await.unwrap();

    // Target is 10, so the sets hold at most twice that.
    assert!(outcome.inserts.len() <= 20);
    assert_eq!(outcome.tasks, 5000);
}

#[tokio::test]
async fn test_every_task_sampled_when_target_exceeds_tasks() {
    let session = Arc::new(MemorySession::new());
    let runner = BenchRunner::new(session, small_config(Workload::Mixed, 8, 2, 4));

    runner.prepare().await.unwrap();
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome.inserts.len(), 8);
    assert_eq!(outcome.selects.len(), 8);
}

#[tokio::test]
async fn test_outcome_converts_to_raw_report() {
    let session = Arc::new(MemorySession::new());
    let runner = BenchRunner::new(session, small_config(Workload::Mixed, 8, 2, 4));

    runner.prepare().await.unwrap();
    let outcome = runner.run().await.unwrap();
    let raw = RawReport::from_outcome(&outcome);

    let mut buf = Vec::new();
    raw.write_to(&mut buf).unwrap();
    let parsed = RawReport::parse(buf.as_slice()).unwrap();
    assert_eq!(parsed.inserts.len(), 8);

    let from_raw = parsed.stats();
    let direct = outcome.stats();
    assert_eq!(from_raw.inserts, direct.inserts);
    assert_approx_eq!(
        from_raw.selects.unwrap().mean_ns,
        direct.selects.unwrap().mean_ns,
        1e-9
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_insert_failure_aborts_run() {
    let session = Arc::new(FaultySession::new(Fault::FailInsert(42)));
    let runner = BenchRunner::new(session, mixed_100x4());

    runner.prepare().await.unwrap();
    let err = runner.run().await.unwrap_err();

    match err {
        BenchError::Backend { op, pk, .. } => {
            assert_eq!(op, OperationKind::Insert);
            assert_eq!(pk, 42);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_select_failure_aborts_run() {
    let session = Arc::new(FaultySession::new(Fault::FailSelect(3)));
    let runner = BenchRunner::new(session, mixed_100x4());

    runner.prepare().await.unwrap();
    let err = runner.run().await.unwrap_err();
    assert!(matches!(
        err,
        BenchError::Backend {
            op: OperationKind::Select,
            pk: 3,
            ..
        }
    ));
    assert!(!err.is_correctness_violation());
}

#[tokio::test]
async fn test_corrupt_select_is_correctness_violation() {
    let session = Arc::new(FaultySession::new(Fault::CorruptSelect(7)));
    let runner = BenchRunner::new(session, mixed_100x4());

    runner.prepare().await.unwrap();
    let err = runner.run().await.unwrap_err();

    assert!(err.is_correctness_violation());
    match err {
        BenchError::Mismatch {
            pk,
            expected,
            actual,
        } => {
            assert_eq!(pk, 7);
            assert_eq!(expected, (14, 21));
            assert_eq!(actual, (15, 22));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_prepare_failure_is_setup_error() {
    let session = Arc::new(FaultySession::new(Fault::FailPrepare));
    let runner = BenchRunner::new(session, mixed_100x4());

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, BenchError::Setup(_)));
}

#[tokio::test]
async fn test_failure_in_seeding_pass_is_reported() {
    let session = Arc::new(FaultySession::new(Fault::FailInsert(0)));
    let runner = BenchRunner::new(session, small_config(Workload::Selects, 50, 2, 5));

    let err = runner.prepare().await.unwrap_err();
    assert!(matches!(err, BenchError::Backend { pk: 0, .. }));
}
