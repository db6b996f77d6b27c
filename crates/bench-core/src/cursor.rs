//! Lock-free partitioning of the task domain into batches.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// A contiguous range of task keys claimed by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: u64,
    pub end: u64,
}

impl Batch {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Keys of this batch as primary key values.
    pub fn keys(&self) -> Range<i64> {
        self.start as i64..self.end as i64
    }
}

/// Hands out disjoint batches of `[0, tasks)` to any number of workers.
///
/// The only shared state is the next batch offset, advanced atomically with
/// a saturating add. The offset stops moving once it reaches `tasks`, so
/// every claim after exhaustion returns `None`.
///
/// A cursor covers exactly one pass. Build a fresh one for each pass.
#[derive(Debug)]
pub struct BatchCursor {
    next_start: AtomicU64,
    batch_size: u64,
    tasks: u64,
}

impl BatchCursor {
    /// Create a cursor over `[0, tasks)`. A zero batch size is treated as 1.
    pub fn new(tasks: u64, batch_size: u64) -> Self {
        Self {
            next_start: AtomicU64::new(0),
            batch_size: batch_size.max(1),
            tasks,
        }
    }

    /// Claim the next batch, or `None` once the domain is exhausted.
    pub fn claim(&self) -> Option<Batch> {
        let (tasks, batch_size) = (self.tasks, self.batch_size);
        let start = self
            .next_start
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |start| {
                (start < tasks).then(|| start.saturating_add(batch_size))
            })
            .ok()?;

        Some(Batch {
            start,
            end: start.saturating_add(self.batch_size).min(self.tasks),
        })
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn tasks(&self) -> u64 {
        self.tasks
    }

    /// Number of batches a full pass hands out.
    pub fn total_batches(&self) -> u64 {
        self.tasks.div_ceil(self.batch_size)
    }
}
