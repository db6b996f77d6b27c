//! Tests for CSV output and report lines.

use bench_core::report::{
    format_comparison_table, read_csv, read_csv_file, write_csv, write_csv_file, CSV_HEADER,
    REPORT_HEADER,
};
use bench_core::{BenchResult, RawReport, ReportLine, Workload};
use test_utils::{assert_approx_eq, RUN_TIMES_MS};

fn results() -> Vec<BenchResult> {
    let mut memory = BenchResult::new("memory", Workload::Mixed, 1_000_000, 1024);
    for t in RUN_TIMES_MS {
        memory.record(t);
    }

    let mut postgres = BenchResult::new("postgres", Workload::Inserts, 100_000, 64);
    for t in [3333, 3334, 3336] {
        postgres.record(t);
    }

    vec![memory, postgres]
}

// ============================================================================
// CSV
// ============================================================================

#[test]
fn test_csv_header_is_stable() {
    let mut buf = Vec::new();
    write_csv(&mut buf, &results()).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let header = text.lines().next().unwrap();
    assert_eq!(header, "Driver,Workload,Tasks,concurrency,Time,Standard Deviation");
    assert_eq!(header, CSV_HEADER.join(","));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_csv_uses_fixed_precision() {
    let mut buf = Vec::new();
    write_csv(&mut buf, &results()).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let row = text.lines().nth(1).unwrap();
    assert_eq!(row, "memory,mixed,1000000,1024,1000.000000,7.071068");
}

#[test]
fn test_csv_roundtrip() {
    let results = results();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweep.csv");

    write_csv_file(&path, &results).unwrap();
    let records = read_csv_file(&path).unwrap();

    assert_eq!(records.len(), results.len());
    for (record, result) in records.iter().zip(&results) {
        let summary = result.summary().unwrap();
        assert_eq!(record.driver, result.driver);
        assert_eq!(record.workload, result.workload);
        assert_eq!(record.tasks, result.tasks);
        assert_eq!(record.concurrency, result.concurrency);
        assert_approx_eq!(record.time_ms, summary.mean_ms, 1e-6);
        assert_approx_eq!(record.stddev_ms, summary.stddev_ms, 1e-6);
    }
}

#[test]
fn test_read_csv_rejects_unknown_workload() {
    let input = "Driver,Workload,Tasks,concurrency,Time,Standard Deviation\nx,deletes,1,1,1.0,0.0\n";
    assert!(read_csv(input.as_bytes()).is_err());
}

#[test]
fn test_comparison_table_lists_every_driver() {
    let mut buf = Vec::new();
    write_csv(&mut buf, &results()).unwrap();
    let records = read_csv(buf.as_slice()).unwrap();

    let table = format_comparison_table(&records);
    assert!(table.contains("memory"));
    assert!(table.contains("postgres"));
    assert!(table.contains("1000.0"));
}

// ============================================================================
// Report lines
// ============================================================================

#[test]
fn test_report_header_columns() {
    let columns: Vec<&str> = REPORT_HEADER.split(", ").collect();
    assert_eq!(columns.len(), 12);
    assert_eq!(columns[0], "driver");
    assert_eq!(columns[5], "bench_time");
    assert_eq!(columns[11], "insert_p99");
}

#[test]
fn test_report_line_from_raw_output() {
    let output = "time 1500\nselect 100\nselect 100\ninsert 40\ninsert 60\n";
    let stats = RawReport::parse(output.as_bytes()).unwrap().stats();
    let line = ReportLine {
        driver: "memory",
        workload: Workload::Mixed,
        tasks: 2,
        concurrency: 1,
        run: 1,
        stats: &stats,
    };

    assert_eq!(
        line.to_string(),
        "memory, mixed, 2, 1, 1, 1500ms, 100ns, 0ns, 100ns, 50ns, 10ns, 60ns"
    );
    assert_eq!(line.to_string().split(", ").count(), 12);
}
