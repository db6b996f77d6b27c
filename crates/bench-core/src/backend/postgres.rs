//! PostgreSQL backend using a sqlx connection pool.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Row};
use tracing::{debug, info};

use super::{PreparedStatement, QueryResult, Session, Statement, TABLE};
use crate::config::BenchConfig;
use crate::error::BackendError;

/// Upper bound on pooled connections, independent of the worker count.
const MAX_POOL_SIZE: u32 = 256;

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => BackendError::Connection(err.to_string()),
            sqlx::Error::RowNotFound => BackendError::MissingRow,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                BackendError::Decode(err.to_string())
            }
            other => BackendError::Execution(other.to_string()),
        }
    }
}

/// Session against a PostgreSQL server. The keyspace maps to a schema.
pub struct PostgresSession {
    pool: PgPool,
    schema: String,
}

impl PostgresSession {
    pub async fn connect(config: &BenchConfig) -> Result<Self, BackendError> {
        let url = connection_url(config)?;
        let pool_size = u32::try_from(config.concurrency)
            .unwrap_or(MAX_POOL_SIZE)
            .clamp(1, MAX_POOL_SIZE);

        info!(pool_size, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(&url)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            schema: config.keyspace.clone(),
        })
    }

    fn statement_sql(&self, statement: Statement) -> String {
        match statement {
            Statement::Insert => format!(
                "INSERT INTO {}.{} (pk, v1, v2) VALUES ($1, $2, $3)",
                self.schema, TABLE
            ),
            Statement::Select => format!(
                "SELECT v1, v2 FROM {}.{} WHERE pk = $1",
                self.schema, TABLE
            ),
        }
    }
}

/// Use the first node verbatim when it is already a URL.
fn connection_url(config: &BenchConfig) -> Result<String, BackendError> {
    let node = config
        .nodes
        .first()
        .ok_or_else(|| BackendError::Connection("no node address configured".to_string()))?;

    if node.starts_with("postgres://") || node.starts_with("postgresql://") {
        return Ok(node.clone());
    }

    Ok(format!(
        "postgres://{}:{}@{}/postgres",
        config.user, config.password, node
    ))
}

#[async_trait]
impl Session for PostgresSession {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn setup_schema(&self) -> Result<(), BackendError> {
        let statements = [
            format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema),
            format!("CREATE SCHEMA {}", self.schema),
            format!(
                "CREATE TABLE {}.{} (pk BIGINT PRIMARY KEY, v1 BIGINT, v2 BIGINT)",
                self.schema, TABLE
            ),
        ];

        for sql in &statements {
            debug!(sql = %sql, "Provisioning schema");
            self.pool.execute(sql.as_str()).await?;
        }
        Ok(())
    }

    async fn prepare(
        &self,
        statement: Statement,
    ) -> Result<Box<dyn PreparedStatement>, BackendError> {
        let sql = self.statement_sql(statement);
        // sqlx caches prepared statements per connection; this validates the
        // text up front so a bad statement fails before the measured pass.
        self.pool.prepare(sql.as_str()).await?;

        Ok(Box::new(PostgresStatement {
            pool: self.pool.clone(),
            sql,
            returns_rows: statement == Statement::Select,
        }))
    }
}

struct PostgresStatement {
    pool: PgPool,
    sql: String,
    returns_rows: bool,
}

#[async_trait]
impl PreparedStatement for PostgresStatement {
    async fn execute(&self, params: &[i64]) -> Result<QueryResult, BackendError> {
        let mut query = sqlx::query(&self.sql);
        for value in params {
            query = query.bind(*value);
        }

        if !self.returns_rows {
            query.execute(&self.pool).await?;
            return Ok(QueryResult::empty());
        }

        let rows = query.fetch_all(&self.pool).await?;
        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult { rows })
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<i64>, BackendError> {
    (0..row.len())
        .map(|i| row.try_get::<i64, _>(i).map_err(BackendError::from))
        .collect()
}
