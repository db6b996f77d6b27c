//! Process-local backend, useful as a baseline and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{PreparedStatement, QueryResult, Session, Statement};
use crate::error::BackendError;

type Table = Arc<RwLock<HashMap<i64, (i64, i64)>>>;

/// In-memory `benchtab` with optional simulated round-trip latency.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    table: Table,
    latency: Option<Duration>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every statement execution.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    pub async fn get(&self, pk: i64) -> Option<(i64, i64)> {
        self.table.read().await.get(&pk).copied()
    }
}

#[async_trait]
impl Session for MemorySession {
    fn name(&self) -> &str {
        "memory"
    }

    async fn setup_schema(&self) -> Result<(), BackendError> {
        self.table.write().await.clear();
        Ok(())
    }

    async fn prepare(
        &self,
        statement: Statement,
    ) -> Result<Box<dyn PreparedStatement>, BackendError> {
        Ok(Box::new(MemoryStatement {
            statement,
            table: self.table.clone(),
            latency: self.latency,
        }))
    }
}

struct MemoryStatement {
    statement: Statement,
    table: Table,
    latency: Option<Duration>,
}

#[async_trait]
impl PreparedStatement for MemoryStatement {
    async fn execute(&self, params: &[i64]) -> Result<QueryResult, BackendError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match (self.statement, params) {
            (Statement::Insert, &[pk, v1, v2]) => {
                self.table.write().await.insert(pk, (v1, v2));
                Ok(QueryResult::empty())
            }
            (Statement::Select, &[pk]) => Ok(match self.table.read().await.get(&pk) {
                Some(&(v1, v2)) => QueryResult::single_row(vec![v1, v2]),
                None => QueryResult::empty(),
            }),
            (statement, params) => Err(BackendError::Execution(format!(
                "{:?} does not take {} parameters",
                statement,
                params.len()
            ))),
        }
    }
}
