//! Benchmark run orchestration: schema setup, seeding and the measured pass.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backend::Session;
use crate::config::{BenchConfig, Workload};
use crate::cursor::BatchCursor;
use crate::error::{BenchError, Result};
use crate::sampler::{LatencySampler, SampleSet};
use crate::stats::{OperationKind, RunStats};
use crate::worker::{SampleSinks, Worker, WorkerContext, WorkerStats};

/// Result of one measured pass over the task domain.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub bench_time: Duration,
    pub batches: u64,
    pub tasks: u64,
    /// Busy time summed over all workers.
    pub worker_busy: Duration,
    pub inserts: SampleSet,
    pub selects: SampleSet,
}

impl RunOutcome {
    pub fn stats(&self) -> RunStats {
        RunStats::new(
            self.bench_time,
            self.inserts.samples(),
            self.selects.samples(),
        )
    }
}

/// Drives a benchmark against one session.
pub struct BenchRunner {
    session: Arc<dyn Session>,
    config: Arc<BenchConfig>,
}

impl BenchRunner {
    /// Create a runner. `config` is expected to be validated.
    pub fn new(session: Arc<dyn Session>, config: BenchConfig) -> Self {
        Self {
            session,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Provision the schema and, for the selects workload, insert every key.
    ///
    /// Does nothing when `dont_prepare` is set.
    pub async fn prepare(&self) -> Result<()> {
        if self.config.dont_prepare {
            info!("Skipping schema setup");
            return Ok(());
        }

        info!(backend = self.session.name(), keyspace = %self.config.keyspace, "Setting up schema");
        self.session
            .setup_schema()
            .await
            .map_err(BenchError::Setup)?;

        if self.config.workload == Workload::Selects {
            let workers = self.config.seeding_workers();
            info!(tasks = self.config.tasks, workers, "Inserting values for selects benchmark");
            let cursor = Arc::new(BatchCursor::new(self.config.tasks, self.config.batch_size));
            let ctx = self.context(Workload::Inserts, cursor, None, CancellationToken::new());
            run_pool(ctx, workers, self.config.seed, self.config.profile, "seed").await?;
        }

        Ok(())
    }

    /// Run the measured pass and collect latency samples.
    pub async fn run(&self) -> Result<RunOutcome> {
        let sampler = LatencySampler::new(self.config.tasks, self.config.sample_target);
        let capacity = sampler.capacity();

        let (insert_tx, insert_rx) = mpsc::channel(capacity);
        let (select_tx, select_rx) = mpsc::channel(capacity);
        let insert_collector = collect(OperationKind::Insert, insert_rx, capacity);
        let select_collector = collect(OperationKind::Select, select_rx, capacity);

        let sinks = SampleSinks {
            inserts: insert_tx,
            selects: select_tx,
        };
        let cursor = Arc::new(BatchCursor::new(self.config.tasks, self.config.batch_size));
        let ctx = self.context(
            self.config.workload,
            cursor,
            Some(sinks),
            CancellationToken::new(),
        );

        info!(
            workload = %self.config.workload,
            tasks = self.config.tasks,
            concurrency = self.config.concurrency,
            batch_size = self.config.batch_size,
            "Starting the benchmark"
        );
        let start = Instant::now();
        let pooled = run_pool(
            ctx,
            self.config.concurrency,
            self.config.seed,
            self.config.profile,
            "worker",
        )
        .await;
        let bench_time = start.elapsed();

        // All senders are gone once the pool returns, so the collectors finish.
        let inserts = join_collector(insert_collector).await?;
        let selects = join_collector(select_collector).await?;
        let totals = pooled?;

        info!(
            bench_time_ms = bench_time.as_millis() as u64,
            batches = totals.batches,
            insert_samples = inserts.len(),
            select_samples = selects.len(),
            "Finished"
        );

        Ok(RunOutcome {
            bench_time,
            batches: totals.batches,
            tasks: totals.tasks,
            worker_busy: totals.busy,
            inserts,
            selects,
        })
    }

    fn context(
        &self,
        workload: Workload,
        cursor: Arc<BatchCursor>,
        sinks: Option<SampleSinks>,
        cancel: CancellationToken,
    ) -> WorkerContext {
        WorkerContext {
            session: self.session.clone(),
            cursor,
            workload,
            sampler: LatencySampler::new(self.config.tasks, self.config.sample_target),
            sinks,
            cancel,
            async_mode: self.config.async_mode,
        }
    }
}

/// Spawn `workers` workers over `ctx` and wait for every one of them.
///
/// The first error cancels the remaining workers, which stop at their next
/// batch claim; it is returned once all of them have finished. With
/// `profile` set every worker logs its busy and idle time.
async fn run_pool(
    ctx: WorkerContext,
    workers: u64,
    seed: Option<u64>,
    profile: bool,
    role: &'static str,
) -> Result<WorkerStats> {
    let cancel = ctx.cancel.clone();
    let mut set = JoinSet::new();

    for id in 0..workers {
        let ctx = ctx.clone();
        let span = info_span!("worker", role, id);
        set.spawn(
            async move {
                let started = Instant::now();
                let result = match Worker::new(id, ctx, seed).await {
                    Ok(worker) => worker.run().await,
                    Err(e) => Err(e),
                };
                if let (true, Ok(stats)) = (profile, &result) {
                    let elapsed = started.elapsed();
                    info!(
                        batches = stats.batches,
                        tasks = stats.tasks,
                        busy_ms = stats.busy.as_millis() as u64,
                        idle_ms = elapsed.saturating_sub(stats.busy).as_millis() as u64,
                        "Worker profile"
                    );
                }
                result
            }
            .instrument(span),
        );
    }
    // Workers hold their own clones of the sample senders.
    drop(ctx);

    let mut totals = WorkerStats::default();
    let mut first_error = None;

    while let Some(joined) = set.join_next().await {
        let result = joined.unwrap_or_else(|e| Err(BenchError::WorkerPanicked(e.to_string())));
        match result {
            Ok(stats) => {
                totals.batches += stats.batches;
                totals.tasks += stats.tasks;
                totals.busy += stats.busy;
            }
            Err(e) => {
                cancel.cancel();
                if first_error.is_none() {
                    warn!(error = %e, "Worker failed, cancelling run");
                    first_error = Some(e);
                } else {
                    debug!(error = %e, "Additional worker failure");
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(totals),
    }
}

fn collect(
    kind: OperationKind,
    mut rx: mpsc::Receiver<u64>,
    capacity: usize,
) -> JoinHandle<SampleSet> {
    tokio::spawn(async move {
        let mut set = SampleSet::with_capacity(capacity);
        while let Some(nanos) = rx.recv().await {
            set.push(nanos);
        }
        if set.dropped() > 0 {
            warn!(kind = %kind, dropped = set.dropped(), "Sample set full, samples dropped");
        }
        set
    })
}

async fn join_collector(handle: JoinHandle<SampleSet>) -> Result<SampleSet> {
    handle
        .await
        .map_err(|e| BenchError::WorkerPanicked(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemorySession;

    fn config(workload: Workload) -> BenchConfig {
        BenchConfig {
            workload,
            tasks: 100,
            concurrency: 4,
            batch_size: 25,
            sample_target: 10,
            seed_concurrency: 2,
            seed: Some(42),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn test_selects_workload_is_seeded() {
        let session = Arc::new(MemorySession::new());
        let runner = BenchRunner::new(session.clone(), config(Workload::Selects));

        runner.prepare().await.unwrap();
        assert_eq!(session.len().await, 100);

        let outcome = runner.run().await.unwrap();
        assert_eq!(outcome.tasks, 100);
        assert!(outcome.inserts.is_empty());
        assert!(outcome.stats().inserts.is_none());
    }

    #[tokio::test]
    async fn test_dont_prepare_skips_seeding() {
        let session = Arc::new(MemorySession::new());
        let mut config = config(Workload::Selects);
        config.dont_prepare = true;
        let runner = BenchRunner::new(session.clone(), config);

        runner.prepare().await.unwrap();
        assert!(session.is_empty().await);
        assert!(runner.run().await.is_err());
    }

    #[tokio::test]
    async fn test_profile_run_reports_worker_busy_time() {
        let session = Arc::new(MemorySession::new().with_latency(Duration::from_micros(200)));
        let mut config = config(Workload::Inserts);
        config.profile = true;
        let runner = BenchRunner::new(session, config);

        runner.prepare().await.unwrap();
        let outcome = runner.run().await.unwrap();
        // 100 inserts of at least 200us each, spread over the workers.
        assert!(outcome.worker_busy >= Duration::from_millis(20));
        assert!(runner.config().profile);
    }

    #[tokio::test]
    async fn test_async_mode_covers_domain() {
        let session = Arc::new(MemorySession::new());
        let mut config = config(Workload::Mixed);
        config.async_mode = true;
        let runner = BenchRunner::new(session.clone(), config);

        runner.prepare().await.unwrap();
        let outcome = runner.run().await.unwrap();
        assert_eq!(outcome.batches, 4);
        assert_eq!(outcome.tasks, 100);
        assert_eq!(session.len().await, 100);
    }
}
