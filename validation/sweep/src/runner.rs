//! Benchmark process execution and sweep orchestration.

use crate::config::{Case, DriverConfig, SweepConfig};
use anyhow::Context;
use bench_core::report::{format_comparison_table, write_csv_file, CsvRecord};
use bench_core::{BenchResult, RawReport, ReportLine};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

/// Runs every case of a sweep the configured number of times.
pub struct SweepRunner {
    config: SweepConfig,
}

impl SweepRunner {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    fn driver(&self, case: &Case) -> &DriverConfig {
        &self.config.drivers[case.driver]
    }

    /// Shell command for one case: the driver command followed by the
    /// matrix flags and the scenario's extra arguments.
    pub fn command_line(&self, case: &Case) -> String {
        let mut command = format!(
            "{} --nodes {} --workload {} --tasks {} --concurrency {}",
            self.driver(case).command,
            self.config.nodes,
            case.workload,
            case.tasks,
            case.concurrency
        );
        for arg in &self.config.extra_args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }

    /// File receiving the stdout of one run.
    pub fn run_output_path(&self, case: &Case, run: usize) -> PathBuf {
        self.config.output_dir.join(format!(
            "{}_workload={}_tasks={}_concurrency={}_run={}",
            self.driver(case).name,
            case.workload,
            case.tasks,
            case.concurrency,
            run
        ))
    }

    fn log_path(&self) -> PathBuf {
        self.config.output_dir.join("running.log")
    }

    /// Command lines in execution order, one per run.
    pub fn planned_commands(&self) -> Vec<String> {
        self.config
            .cases()
            .iter()
            .flat_map(|case| std::iter::repeat(self.command_line(case)).take(self.config.runs))
            .collect()
    }

    /// Execute one run and parse its raw report.
    async fn run_once(&self, case: &Case, run: usize) -> anyhow::Result<RawReport> {
        let command = self.command_line(case);
        let driver = self.driver(case);

        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&driver.dir)
            .output()
            .await
            .with_context(|| format!("failed to start `{}`", command))?;

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        let header = format!("[{}] {}\n", chrono::Local::now().to_rfc3339(), command);
        log.write_all(header.as_bytes()).await?;
        log.write_all(&output.stderr).await?;
        log.flush().await?;

        let output_path = self.run_output_path(case, run);
        fs::write(&output_path, &output.stdout).await?;

        if !output.status.success() {
            anyhow::bail!(
                "`{}` exited with {}\nstdout:\n{}\nstderr:\n{}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        RawReport::parse(output.stdout.as_slice())
            .with_context(|| format!("invalid report in {}", output_path.display()))
    }

    /// Run the sweep and write the CSV of per-configuration results.
    pub async fn run(&self) -> anyhow::Result<Vec<BenchResult>> {
        fs::create_dir_all(&self.config.output_dir).await.with_context(|| {
            format!(
                "failed to create output directory {}",
                self.config.output_dir.display()
            )
        })?;

        let pb = ProgressBar::new(self.config.total_runs());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} runs {msg}")?
                .progress_chars("##-"),
        );

        let pause = Duration::from_secs(self.config.pause_secs);
        let mut results = Vec::new();
        let mut first = true;

        for case in self.config.cases() {
            let driver = self.driver(&case);
            let mut result = BenchResult::new(&driver.name, case.workload, case.tasks, case.concurrency);
            info!(case = %result.label(), "Starting case");
            pb.set_message(result.label());

            for run in 1..=self.config.runs {
                if !first && !pause.is_zero() {
                    sleep(pause).await;
                }
                first = false;

                let raw = self.run_once(&case, run).await.map_err(|e| {
                    pb.abandon();
                    e
                })?;
                let stats = raw.stats();
                if stats.inserts.is_none() && stats.selects.is_none() {
                    warn!(case = %result.label(), run, "Run reported no latency samples");
                }

                let line = ReportLine {
                    driver: &driver.name,
                    workload: case.workload,
                    tasks: case.tasks,
                    concurrency: case.concurrency,
                    run,
                    stats: &stats,
                };
                pb.suspend(|| println!("{}", line));

                result.record(raw.time_ms);
                pb.inc(1);
            }

            results.push(result);
        }

        pb.finish_with_message("done");

        let csv_path = self.config.csv_path();
        write_csv_file(&csv_path, &results)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        info!(path = %csv_path.display(), "Results written");

        Ok(results)
    }

    /// Comparison table of the given results.
    pub fn summary_table(results: &[BenchResult]) -> anyhow::Result<String> {
        let records = results
            .iter()
            .map(CsvRecord::from_result)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format_comparison_table(&records))
    }
}
