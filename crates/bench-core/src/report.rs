//! Report output: the raw sample protocol, report lines, CSV and tables.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::config::Workload;
use crate::error::ReportError;
use crate::results::BenchResult;
use crate::runner::RunOutcome;
use crate::stats::{LatencyStats, RunStats};

/// Header printed once before the report lines.
pub const REPORT_HEADER: &str = "driver, workload, tasks, concurrency, run, bench_time, select_avg, select_stddev, select_p99, insert_avg, insert_stddev, insert_p99";

/// CSV column names. External tooling depends on this exact order and spelling.
pub const CSV_HEADER: [&str; 6] = [
    "Driver",
    "Workload",
    "Tasks",
    "concurrency",
    "Time",
    "Standard Deviation",
];

const NO_DATA: &str = "-";

// ============================================================================
// Raw sample protocol
// ============================================================================

/// Samples of one run as exchanged between the benchmark and the sweep:
/// `time <ms>` followed by `select <ns>` and `insert <ns>` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    pub time_ms: u64,
    pub selects: Vec<u64>,
    pub inserts: Vec<u64>,
}

impl RawReport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        Self {
            time_ms: outcome.bench_time.as_millis() as u64,
            selects: outcome.selects.samples().to_vec(),
            inserts: outcome.inserts.samples().to_vec(),
        }
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<(), ReportError> {
        writeln!(out, "time {}", self.time_ms)?;
        for sample in &self.selects {
            writeln!(out, "select {}", sample)?;
        }
        for sample in &self.inserts {
            writeln!(out, "insert {}", sample)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Parse the raw protocol. Lines with other leading tags are skipped.
    pub fn parse<R: BufRead>(input: R) -> Result<Self, ReportError> {
        let mut report = RawReport::default();
        let mut saw_time = false;

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let (Some(tag), value) = (fields.next(), fields.next()) else {
                continue;
            };
            if !matches!(tag, "time" | "select" | "insert") {
                continue;
            }

            let value = value.unwrap_or_default();
            let parsed: u64 = value.parse().map_err(|_| ReportError::Parse {
                line: index + 1,
                tag: tag.to_string(),
                value: value.to_string(),
            })?;

            match tag {
                "time" => {
                    report.time_ms = parsed;
                    saw_time = true;
                }
                "select" => report.selects.push(parsed),
                _ => report.inserts.push(parsed),
            }
        }

        if !saw_time {
            return Err(ReportError::MissingTime);
        }
        Ok(report)
    }

    pub fn stats(&self) -> RunStats {
        RunStats::from_millis(self.time_ms, &self.inserts, &self.selects)
    }
}

// ============================================================================
// Report lines
// ============================================================================

/// One line of the interactive report for a single run.
#[derive(Debug, Clone)]
pub struct ReportLine<'a> {
    pub driver: &'a str,
    pub workload: Workload,
    pub tasks: u64,
    pub concurrency: u64,
    pub run: usize,
    pub stats: &'a RunStats,
}

fn write_latency(f: &mut fmt::Formatter<'_>, stats: Option<&LatencyStats>) -> fmt::Result {
    match stats {
        Some(s) => write!(
            f,
            ", {}ns, {}ns, {}ns",
            s.mean_ns as u64, s.stddev_ns as u64, s.p99_ns
        ),
        None => write!(f, ", {}, {}, {}", NO_DATA, NO_DATA, NO_DATA),
    }
}

impl fmt::Display for ReportLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}ms",
            self.driver,
            self.workload,
            self.tasks,
            self.concurrency,
            self.run,
            self.stats.bench_time_ms
        )?;
        write_latency(f, self.stats.selects.as_ref())?;
        write_latency(f, self.stats.inserts.as_ref())
    }
}

// ============================================================================
// CSV
// ============================================================================

/// One CSV row as read back from a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Workload")]
    pub workload: Workload,
    #[serde(rename = "Tasks")]
    pub tasks: u64,
    #[serde(rename = "concurrency")]
    pub concurrency: u64,
    #[serde(rename = "Time")]
    pub time_ms: f64,
    #[serde(rename = "Standard Deviation")]
    pub stddev_ms: f64,
}

impl CsvRecord {
    /// Row for a configuration with at least one recorded run.
    pub fn from_result(result: &BenchResult) -> Result<Self, ReportError> {
        let summary = result
            .summary()
            .ok_or_else(|| ReportError::NoRuns(result.label()))?;
        Ok(Self {
            driver: result.driver.clone(),
            workload: result.workload,
            tasks: result.tasks,
            concurrency: result.concurrency,
            time_ms: summary.mean_ms,
            stddev_ms: summary.stddev_ms,
        })
    }
}

/// Write one row per configuration. Floats use fixed 6-digit precision.
pub fn write_csv<W: Write>(out: W, results: &[BenchResult]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for result in results {
        let record = CsvRecord::from_result(result)?;
        writer.write_record([
            record.driver,
            record.workload.to_string(),
            record.tasks.to_string(),
            record.concurrency.to_string(),
            format!("{:.6}", record.time_ms),
            format!("{:.6}", record.stddev_ms),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_csv_file(path: impl AsRef<Path>, results: &[BenchResult]) -> Result<(), ReportError> {
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), results)
}

pub fn read_csv<R: std::io::Read>(input: R) -> Result<Vec<CsvRecord>, ReportError> {
    let mut reader = csv::Reader::from_reader(input);
    let records = reader
        .deserialize()
        .collect::<Result<Vec<CsvRecord>, csv::Error>>()?;
    Ok(records)
}

pub fn read_csv_file(path: impl AsRef<Path>) -> Result<Vec<CsvRecord>, ReportError> {
    read_csv(std::fs::File::open(path)?)
}

// ============================================================================
// Tables
// ============================================================================

fn latency_cells(stats: Option<&LatencyStats>) -> [String; 4] {
    match stats {
        Some(s) => [
            s.count.to_string(),
            format!("{:.1}", s.mean_ns / 1000.0),
            format!("{:.1}", s.stddev_ns / 1000.0),
            format!("{:.1}", s.p99_ns as f64 / 1000.0),
        ],
        None => [0.to_string(), "no data".into(), "no data".into(), "no data".into()],
    }
}

/// Format one run as a console table. Latencies are in microseconds.
pub fn format_run_table(driver: &str, stats: &RunStats) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            format!("{} ({} ms)", driver, stats.bench_time_ms),
            "samples".to_string(),
            "avg (us)".to_string(),
            "stddev (us)".to_string(),
            "p99 (us)".to_string(),
        ]);

    for (name, latency) in [("select", stats.selects.as_ref()), ("insert", stats.inserts.as_ref())] {
        let mut row = vec![name.to_string()];
        row.extend(latency_cells(latency));
        table.add_row(row);
    }

    table.to_string()
}

/// Format CSV records from one or more files as a comparison table.
pub fn format_comparison_table(records: &[CsvRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Driver",
            "Workload",
            "Tasks",
            "Concurrency",
            "Time (ms)",
            "Std Dev (ms)",
        ]);

    let mut sorted: Vec<&CsvRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.workload.as_str(), a.tasks, a.concurrency, &a.driver)
            .cmp(&(b.workload.as_str(), b.tasks, b.concurrency, &b.driver))
    });

    for record in sorted {
        table.add_row(vec![
            record.driver.clone(),
            record.workload.to_string(),
            record.tasks.to_string(),
            record.concurrency.to_string(),
            format!("{:.1}", record.time_ms),
            format!("{:.1}", record.stddev_ms),
        ]);
    }

    table.to_string()
}

/// Format run statistics as JSON.
pub fn format_json(stats: &RunStats) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line_with_no_selects() {
        let stats = RunStats::from_millis(1500, &[100, 300], &[]);
        let line = ReportLine {
            driver: "memory",
            workload: Workload::Inserts,
            tasks: 1000,
            concurrency: 8,
            run: 2,
            stats: &stats,
        };
        assert_eq!(
            line.to_string(),
            "memory, inserts, 1000, 8, 2, 1500ms, -, -, -, 200ns, 100ns, 300ns"
        );
    }

    #[test]
    fn test_raw_roundtrip_keeps_order() {
        let raw = RawReport {
            time_ms: 42,
            selects: vec![5, 3],
            inserts: vec![9],
        };
        let mut buf = Vec::new();
        raw.write_to(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "time 42\nselect 5\nselect 3\ninsert 9\n"
        );
        assert_eq!(RawReport::parse(buf.as_slice()).unwrap(), raw);
    }

    #[test]
    fn test_raw_parse_skips_unknown_lines() {
        let input = "Preparing a selects benchmark (inserting values)...\ntime 7\ninsert 10\n\n";
        let raw = RawReport::parse(input.as_bytes()).unwrap();
        assert_eq!(raw.time_ms, 7);
        assert_eq!(raw.inserts, vec![10]);
    }

    #[test]
    fn test_raw_parse_rejects_bad_value() {
        let err = RawReport::parse("time 7\nselect abc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_raw_parse_requires_time() {
        let err = RawReport::parse("select 1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::MissingTime));
    }

    #[test]
    fn test_csv_without_runs_is_an_error() {
        let results = vec![BenchResult::new("memory", Workload::Mixed, 10, 1)];
        let err = write_csv(Vec::new(), &results).unwrap_err();
        assert!(matches!(err, ReportError::NoRuns(_)));
    }

    #[test]
    fn test_run_table_mentions_no_data() {
        let stats = RunStats::from_millis(10, &[1000], &[]);
        let table = format_run_table("memory", &stats);
        assert!(table.contains("no data"));
        assert!(table.contains("memory (10 ms)"));
    }
}
