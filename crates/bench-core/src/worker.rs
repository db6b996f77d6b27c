//! Workers that drain the batch cursor and issue benchmark statements.

use futures::future::try_join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::backend::{PreparedStatement, Session, Statement};
use crate::config::Workload;
use crate::cursor::{Batch, BatchCursor};
use crate::error::{BenchError, Result};
use crate::sampler::LatencySampler;
use crate::stats::OperationKind;

/// Values stored for key `pk`.
pub fn expected_values(pk: i64) -> (i64, i64) {
    (2 * pk, 3 * pk)
}

/// Sending halves of the per-kind sample channels.
#[derive(Clone)]
pub struct SampleSinks {
    pub inserts: mpsc::Sender<u64>,
    pub selects: mpsc::Sender<u64>,
}

impl SampleSinks {
    async fn record(&self, kind: OperationKind, start: Instant) -> Result<()> {
        let nanos = start.elapsed().as_nanos() as u64;
        let sink = match kind {
            OperationKind::Insert => &self.inserts,
            OperationKind::Select => &self.selects,
        };
        sink.send(nanos)
            .await
            .map_err(|_| BenchError::SampleChannelClosed)
    }
}

/// What a worker did before the cursor ran dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: u64,
    pub tasks: u64,
    /// Time spent executing batches, excluding claims and idle time.
    pub busy: Duration,
}

/// Everything a worker needs besides its own statements and RNG.
#[derive(Clone)]
pub struct WorkerContext {
    pub session: Arc<dyn Session>,
    pub cursor: Arc<BatchCursor>,
    pub workload: Workload,
    pub sampler: LatencySampler,
    /// `None` for passes that record nothing, such as seeding.
    pub sinks: Option<SampleSinks>,
    pub cancel: CancellationToken,
    pub async_mode: bool,
}

/// One unit of concurrent execution with private prepared statements.
pub struct Worker {
    id: u64,
    ctx: WorkerContext,
    insert: Option<Box<dyn PreparedStatement>>,
    select: Option<Box<dyn PreparedStatement>>,
    rng: StdRng,
}

impl Worker {
    /// Prepare the statements the workload needs.
    pub async fn new(id: u64, ctx: WorkerContext, seed: Option<u64>) -> Result<Self> {
        let insert = if ctx.workload.has_inserts() {
            Some(prepare(ctx.session.as_ref(), Statement::Insert).await?)
        } else {
            None
        };
        let select = if ctx.workload.has_selects() {
            Some(prepare(ctx.session.as_ref(), Statement::Select).await?)
        } else {
            None
        };

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id,
            ctx,
            insert,
            select,
            rng,
        })
    }

    /// Claim and execute batches until the cursor is exhausted or the run
    /// is cancelled. The first failure cancels the run and is returned.
    pub async fn run(mut self) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();

        while !self.ctx.cancel.is_cancelled() {
            let Some(batch) = self.ctx.cursor.claim() else {
                break;
            };
            trace!(worker = self.id, start = batch.start, end = batch.end, "Claimed batch");

            let started = Instant::now();
            let result = if self.ctx.async_mode {
                self.run_batch_concurrently(batch).await
            } else {
                self.run_batch(batch).await
            };
            if let Err(e) = result {
                self.ctx.cancel.cancel();
                return Err(e);
            }

            stats.batches += 1;
            stats.tasks += batch.len();
            stats.busy += started.elapsed();
        }

        Ok(stats)
    }

    async fn run_batch(&mut self, batch: Batch) -> Result<()> {
        for pk in batch.keys() {
            let sampled = self.ctx.sampler.should_sample(&mut self.rng);
            self.execute_task(pk, sampled).await?;
        }
        Ok(())
    }

    async fn run_batch_concurrently(&mut self, batch: Batch) -> Result<()> {
        let sampled: Vec<(i64, bool)> = batch
            .keys()
            .map(|pk| (pk, self.ctx.sampler.should_sample(&mut self.rng)))
            .collect();

        let this = &*self;
        try_join_all(
            sampled
                .into_iter()
                .map(|(pk, sampled)| this.execute_task(pk, sampled)),
        )
        .await?;
        Ok(())
    }

    async fn execute_task(&self, pk: i64, sampled: bool) -> Result<()> {
        let (v1, v2) = expected_values(pk);

        if let Some(insert) = &self.insert {
            let start = sampled.then(Instant::now);
            insert
                .execute(&[pk, v1, v2])
                .await
                .map_err(|source| BenchError::Backend {
                    op: OperationKind::Insert,
                    pk,
                    source,
                })?;
            if let Some(start) = start {
                self.record(OperationKind::Insert, start).await?;
            }
        }

        if let Some(select) = &self.select {
            let start = sampled.then(Instant::now);
            let backend_err = |source| BenchError::Backend {
                op: OperationKind::Select,
                pk,
                source,
            };
            let result = select.execute(&[pk]).await.map_err(backend_err)?;
            let actual = (
                result.column_i64(0).map_err(backend_err)?,
                result.column_i64(1).map_err(backend_err)?,
            );
            if actual != (v1, v2) {
                return Err(BenchError::Mismatch {
                    pk,
                    expected: (v1, v2),
                    actual,
                });
            }
            if let Some(start) = start {
                self.record(OperationKind::Select, start).await?;
            }
        }

        Ok(())
    }

    async fn record(&self, kind: OperationKind, start: Instant) -> Result<()> {
        match &self.ctx.sinks {
            Some(sinks) => sinks.record(kind, start).await,
            None => Ok(()),
        }
    }
}

async fn prepare(session: &dyn Session, statement: Statement) -> Result<Box<dyn PreparedStatement>> {
    session.prepare(statement).await.map_err(BenchError::Setup)
}
