//! Database driver benchmark executable.
//!
//! Runs one measured pass of the configured workload and prints the raw
//! report on stdout:
//! - `time <ms>` with the wall-clock time of the pass
//! - `select <ns>` / `insert <ns>` for every sampled operation
//!
//! Logs go to stderr so the sweep orchestrator can parse stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bench_core::backend::MemorySession;
use bench_core::report::{format_json, format_run_table};
use bench_core::{BackendKind, BenchConfig, BenchRunner, RawReport, Session, Workload};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// `time`/`select`/`insert` lines for the sweep orchestrator
    Raw,
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "bench")]
#[command(about = "Insert/select load benchmark for database drivers")]
struct Args {
    /// Addresses of database nodes to connect to separated by a comma
    #[arg(long, default_value = "127.0.0.1:5432", value_delimiter = ',')]
    nodes: Vec<String>,

    /// Type of work to perform (inserts, selects, mixed)
    #[arg(long, default_value = "mixed")]
    workload: Workload,

    /// Backend to benchmark (memory, postgres)
    #[arg(long, default_value = "memory")]
    backend: BackendKind,

    #[arg(long, env = "BENCH_USER", default_value = "cassandra")]
    user: String,

    #[arg(long, env = "BENCH_PASSWORD", default_value = "cassandra", hide_env_values = true)]
    password: String,

    /// Test keyspace
    #[arg(long, default_value = "benchks")]
    keyspace: String,

    /// Total number of tasks to perform. A mixed workload issues this many
    /// inserts and this many selects
    #[arg(long, default_value = "1000000")]
    tasks: u64,

    /// Maximum number of workers
    #[arg(long, default_value = "1024")]
    concurrency: u64,

    /// Number of tasks in one batch performed by a worker
    #[arg(long, default_value = "256")]
    batch_size: u64,

    /// Don't create tables and insert into them before the benchmark
    #[arg(long)]
    dont_prepare: bool,

    /// Issue the tasks of a batch concurrently
    #[arg(long = "async")]
    async_mode: bool,

    /// Log per-worker busy/idle times
    #[arg(long)]
    profile: bool,

    /// Expected number of latency samples per operation kind
    #[arg(long, default_value = "20000")]
    samples: u64,

    /// RNG seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated round-trip latency of the memory backend, in microseconds
    #[arg(long)]
    latency_us: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "raw")]
    output: OutputFormat,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn to_config(&self) -> BenchConfig {
        BenchConfig {
            nodes: self.nodes.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            keyspace: self.keyspace.clone(),
            workload: self.workload,
            tasks: self.tasks,
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            dont_prepare: self.dont_prepare,
            async_mode: self.async_mode,
            profile: self.profile,
            sample_target: self.samples,
            seed: self.seed,
            ..Default::default()
        }
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let span_events = if args.profile {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_span_events(span_events);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn connect(args: &Args, config: &BenchConfig) -> Result<Arc<dyn Session>> {
    if let (BackendKind::Memory, Some(us)) = (args.backend, args.latency_us) {
        return Ok(Arc::new(
            MemorySession::new().with_latency(Duration::from_micros(us)),
        ));
    }

    bench_core::connect(args.backend, config)
        .await
        .with_context(|| format!("failed to connect {} backend", args.backend))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    info!(backend = %args.backend, "Starting benchmark");

    let config = args.to_config().validate().context("invalid configuration")?;
    info!("Benchmark configuration: {:?}", config);

    let session = connect(&args, &config).await?;
    let runner = BenchRunner::new(session.clone(), config);

    runner.prepare().await.context("failed to prepare benchmark")?;
    let outcome = runner.run().await.context("benchmark run failed")?;

    match args.output {
        OutputFormat::Raw => {
            let stdout = std::io::stdout();
            RawReport::from_outcome(&outcome).write_to(stdout.lock())?;
        }
        OutputFormat::Table => {
            println!("{}", format_run_table(session.name(), &outcome.stats()));
        }
        OutputFormat::Json => {
            println!("{}", format_json(&outcome.stats())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_config() {
        let args = Args::parse_from([
            "bench",
            "--nodes",
            "10.0.0.1:5432,10.0.0.2:5432",
            "--workload",
            "selects",
            "--tasks",
            "1000",
            "--concurrency",
            "64",
            "--async",
            "--dont-prepare",
        ]);
        let config = args.to_config().validate().unwrap();

        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.workload, Workload::Selects);
        assert!(config.async_mode);
        assert!(config.dont_prepare);
        // 1000 / 256 < 64, so the batch size shrinks.
        assert_eq!(config.batch_size, 15);
    }

    #[test]
    fn test_invalid_workload_is_rejected() {
        let parsed = Args::try_parse_from(["bench", "--workload", "updates"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_with_latency() {
        let args = Args::parse_from(["bench", "--latency-us", "10"]);
        let config = args.to_config();
        let session = connect(&args, &config).await.unwrap();
        assert_eq!(session.name(), "memory");
    }
}
