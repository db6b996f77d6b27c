//! Sessions for exercising the worker pool in tests.
//!
//! Both wrap a [`MemorySession`] so inserted rows are really stored and
//! selects return real values unless a fault says otherwise.

use async_trait::async_trait;
use bench_core::backend::MemorySession;
use bench_core::{BackendError, PreparedStatement, QueryResult, Session, Statement};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-key execution counts.
#[derive(Debug, Default)]
pub struct OpCounts {
    pub inserts: HashMap<i64, u32>,
    pub selects: HashMap<i64, u32>,
    pub prepares: u32,
}

/// Session that counts how often each key is inserted and selected.
#[derive(Clone, Default)]
pub struct CountingSession {
    inner: MemorySession,
    counts: Arc<Mutex<OpCounts>>,
}

impl CountingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the current counts.
    pub fn with_counts<T>(&self, f: impl FnOnce(&OpCounts) -> T) -> T {
        let counts = self.counts.lock().expect("counts lock poisoned");
        f(&counts)
    }
}

#[async_trait]
impl Session for CountingSession {
    fn name(&self) -> &str {
        "counting"
    }

    async fn setup_schema(&self) -> Result<(), BackendError> {
        *self.counts.lock().expect("counts lock poisoned") = OpCounts::default();
        self.inner.setup_schema().await
    }

    async fn prepare(
        &self,
        statement: Statement,
    ) -> Result<Box<dyn PreparedStatement>, BackendError> {
        self.counts.lock().expect("counts lock poisoned").prepares += 1;
        Ok(Box::new(CountingStatement {
            statement,
            inner: self.inner.prepare(statement).await?,
            counts: self.counts.clone(),
        }))
    }
}

struct CountingStatement {
    statement: Statement,
    inner: Box<dyn PreparedStatement>,
    counts: Arc<Mutex<OpCounts>>,
}

#[async_trait]
impl PreparedStatement for CountingStatement {
    async fn execute(&self, params: &[i64]) -> Result<QueryResult, BackendError> {
        let result = self.inner.execute(params).await?;
        let pk = params[0];
        let mut counts = self.counts.lock().expect("counts lock poisoned");
        let map = match self.statement {
            Statement::Insert => &mut counts.inserts,
            Statement::Select => &mut counts.selects,
        };
        *map.entry(pk).or_insert(0) += 1;
        Ok(result)
    }
}

/// Failure injected by a [`FaultySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Inserting this key fails with an execution error.
    FailInsert(i64),
    /// Selecting this key fails with a connection error.
    FailSelect(i64),
    /// Selecting this key returns values off by one.
    CorruptSelect(i64),
    /// Preparing any statement fails.
    FailPrepare,
}

/// Session that behaves like [`MemorySession`] apart from one fault.
#[derive(Clone)]
pub struct FaultySession {
    inner: MemorySession,
    fault: Fault,
}

impl FaultySession {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemorySession::new(),
            fault,
        }
    }
}

#[async_trait]
impl Session for FaultySession {
    fn name(&self) -> &str {
        "faulty"
    }

    async fn setup_schema(&self) -> Result<(), BackendError> {
        self.inner.setup_schema().await
    }

    async fn prepare(
        &self,
        statement: Statement,
    ) -> Result<Box<dyn PreparedStatement>, BackendError> {
        if self.fault == Fault::FailPrepare {
            return Err(BackendError::Connection("node unreachable".to_string()));
        }
        Ok(Box::new(FaultyStatement {
            statement,
            inner: self.inner.prepare(statement).await?,
            fault: self.fault,
        }))
    }
}

struct FaultyStatement {
    statement: Statement,
    inner: Box<dyn PreparedStatement>,
    fault: Fault,
}

#[async_trait]
impl PreparedStatement for FaultyStatement {
    async fn execute(&self, params: &[i64]) -> Result<QueryResult, BackendError> {
        let pk = params[0];
        match (self.statement, self.fault) {
            (Statement::Insert, Fault::FailInsert(bad)) if bad == pk => {
                Err(BackendError::Execution(format!("write timeout for pk {}", pk)))
            }
            (Statement::Select, Fault::FailSelect(bad)) if bad == pk => {
                Err(BackendError::Connection("connection reset by peer".to_string()))
            }
            (Statement::Select, Fault::CorruptSelect(bad)) if bad == pk => {
                let result = self.inner.execute(params).await?;
                let v1 = result.column_i64(0)?;
                let v2 = result.column_i64(1)?;
                Ok(QueryResult::single_row(vec![v1 + 1, v2 + 1]))
            }
            _ => self.inner.execute(params).await,
        }
    }
}
