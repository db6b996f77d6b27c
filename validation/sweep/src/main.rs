//! Sweep CLI for comparing database driver benchmarks.

use bench_core::report::{format_comparison_table, read_csv_file, REPORT_HEADER};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "Runs driver benchmarks over a configuration matrix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sweep from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override number of runs per configuration
        #[arg(short, long)]
        runs: Option<usize>,

        /// Override output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },

    /// Compare results from one or more CSV files
    Compare {
        /// CSV files written by previous sweeps
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            runs,
            output_dir,
            dry_run,
        } => {
            eprintln!("Loading scenario: {}", scenario.display());

            let mut config = sweep::SweepConfig::from_file(&scenario)?;

            if let Some(r) = runs {
                config.runs = r;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            config.validate()?;

            eprintln!("✓ Configuration loaded successfully");
            eprintln!("  Name: {}", config.name);
            eprintln!("  Description: {}", config.description);
            eprintln!("  Drivers: {}", config.drivers.len());
            eprintln!("  Runs: {}", config.total_runs());
            eprintln!();

            let runner = sweep::SweepRunner::new(config);

            if dry_run {
                for command in runner.planned_commands() {
                    println!("{}", command);
                }
                return Ok(());
            }

            println!("{}", REPORT_HEADER);
            let results = runner.run().await?;

            println!();
            println!("{}", sweep::SweepRunner::summary_table(&results)?);
            println!("Results written to {}", runner.config().csv_path().display());

            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            let mut scenarios = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                    continue;
                }
                // Skip files that do not parse as scenarios
                if let Ok(config) = sweep::SweepConfig::from_file(&path) {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    scenarios.push((file_name, config.name, config.description));
                }
            }

            scenarios.sort_by(|a, b| a.0.cmp(&b.0));

            if scenarios.is_empty() {
                println!("No scenario files found");
            } else {
                for (filename, name, desc) in scenarios {
                    println!("  {} - {}", filename, name);
                    println!("    {}", desc);
                    println!();
                }
            }

            Ok(())
        }
        Commands::Compare { files } => {
            let mut records = Vec::new();
            for file in &files {
                records.extend(read_csv_file(file)?);
            }
            println!("{}", format_comparison_table(&records));
            Ok(())
        }
    }
}
