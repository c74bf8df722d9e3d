// src/report/load.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::report::coerce::{numeric_column, required_numeric_column, Coercion};
use crate::report::{extract_table, Table};

/// Report file the stress-test runner drops in the working directory.
pub const REPORT_FILE: &str = "performance-report.md";

pub const BATCH_SECTION: &str = "## Batch Progression";
pub const DETAIL_SECTION: &str = "## Detailed Metrics";

/// Per-operation latency columns of the detailed metrics table, in the order
/// the runner writes them.
pub const OPERATIONS: &[&str] = &[
    "Register", "Login", "Profile", "Lobby", "Socket", "Update", "Search",
];
pub const TOTAL_COLUMN: &str = "Total";
const USER_COLUMN: &str = "User";

/// One row of the batch progression table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub batch_size: u32,
    pub max_latency_ms: f64,
    pub success: u32,
    pub failed: u32,
    pub status: String,
}

impl BatchRecord {
    pub fn passed(&self) -> bool {
        self.status == "PASS"
    }
}

/// One user's per-operation latencies from the detailed metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRecord {
    pub user: u32,
    /// Latency per operation column; `None` where the runner wrote a
    /// non-numeric placeholder.
    pub latencies: BTreeMap<String, Option<f64>>,
    pub total: Option<f64>,
}

/// Read the report file, distinguishing "not produced yet" from real I/O
/// failures.
pub fn read_report(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading report {}", path.display())),
    }
}

/// Load the batch progression table. Load and latency columns are strict:
/// a malformed cell makes the whole table unusable.
pub fn parse_batches(content: &str) -> Result<Vec<BatchRecord>> {
    let table = extract_table(content, BATCH_SECTION, Some(DETAIL_SECTION));
    if table.is_empty() {
        return Ok(Vec::new());
    }
    log_drops(&table, BATCH_SECTION);

    let sizes = required_numeric_column(&table, "Batch Size")?;
    let latencies = required_numeric_column(&table, "Max Latency (ms)")?;
    let successes = required_numeric_column(&table, "Success")?;
    let failures = required_numeric_column(&table, "Failed")?;
    let statuses = table
        .column("Status")
        .context("column 'Status' not found in table")?;

    let records = (0..table.len())
        .map(|i| BatchRecord {
            batch_size: sizes[i] as u32,
            max_latency_ms: latencies[i],
            success: successes[i] as u32,
            failed: failures[i] as u32,
            status: statuses[i].to_string(),
        })
        .collect();
    Ok(records)
}

/// Load the detailed metrics table. The user id is strict; operation columns
/// are lenient, so a stray placeholder becomes a missing sample instead of
/// sinking the table. Records come back sorted by user id.
pub fn parse_details(content: &str) -> Result<Vec<DetailRecord>> {
    let table = extract_table(content, DETAIL_SECTION, None);
    if table.is_empty() {
        return Ok(Vec::new());
    }
    log_drops(&table, DETAIL_SECTION);

    let users = required_numeric_column(&table, USER_COLUMN)?;

    let mut op_columns: Vec<(&str, Vec<Option<f64>>)> = Vec::new();
    for &op in OPERATIONS {
        if table.column_index(op).is_some() {
            op_columns.push((op, numeric_column(&table, op, Coercion::Lenient)?));
        }
    }
    let totals = match table.column_index(TOTAL_COLUMN) {
        Some(_) => Some(numeric_column(&table, TOTAL_COLUMN, Coercion::Lenient)?),
        None => None,
    };

    let mut records: Vec<DetailRecord> = (0..table.len())
        .map(|i| DetailRecord {
            user: users[i] as u32,
            latencies: op_columns
                .iter()
                .map(|(op, col)| (op.to_string(), col[i]))
                .collect(),
            total: totals.as_ref().and_then(|col| col[i]),
        })
        .collect();
    records.sort_by_key(|r| r.user);
    Ok(records)
}

fn log_drops(table: &Table, section: &str) {
    if table.dropped_rows > 0 {
        debug!(
            section,
            dropped = table.dropped_rows,
            "dropped malformed table rows"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const REPORT: &str = r#"# Stress Test Report

## Batch Progression

| Batch Size | Max Latency (ms) | Success | Failed | Status |
|------------|------------------|---------|--------|--------|
| 10         | 100.0            | 10      | 0      | PASS   |
| 20         | 250.0            | 20      | 0      | PASS   |
| 40         | 900.0            | 38      | 2      | FAIL   |

## Detailed Metrics

| User | Register | Login | Profile | Total |
|------|----------|-------|---------|-------|
| 10   | 12.0     | 8.5   | 30.0    | 50.5  |
| 2    | 14.1     | -     | 28.0    | 42.1  |
| 1    | 11.8     | 7.9   | 29.5    | 49.2  |
"#;

    #[test]
    fn parses_batch_records() {
        let batches = parse_batches(REPORT).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(
            batches[0],
            BatchRecord {
                batch_size: 10,
                max_latency_ms: 100.0,
                success: 10,
                failed: 0,
                status: "PASS".to_string(),
            }
        );
        assert!(batches[0].passed());
        assert!(!batches[2].passed());
    }

    #[test]
    fn parses_details_sorted_by_user() {
        let details = parse_details(REPORT).unwrap();
        let users: Vec<u32> = details.iter().map(|d| d.user).collect();
        assert_eq!(users, vec![1, 2, 10]);
    }

    #[test]
    fn lenient_operation_columns_keep_missing_markers() {
        let details = parse_details(REPORT).unwrap();
        let user2 = &details[1];
        assert_eq!(user2.latencies["Register"], Some(14.1));
        assert_eq!(user2.latencies["Login"], None);
        assert_eq!(user2.total, Some(42.1));
        // Columns absent from the report are absent from the record too.
        assert!(!user2.latencies.contains_key("Socket"));
    }

    #[test]
    fn strict_failure_aborts_only_its_table() {
        let report = REPORT.replace("| 20         | 250.0", "| twenty     | 250.0");
        assert!(parse_batches(&report).is_err());
        assert!(parse_details(&report).is_ok());
    }

    #[test]
    fn empty_report_loads_as_no_data() {
        assert!(parse_batches("").unwrap().is_empty());
        assert!(parse_details("no tables here").unwrap().is_empty());
    }

    #[test]
    fn read_report_distinguishes_absence_from_content() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(REPORT.as_bytes()).unwrap();
        assert!(read_report(tmp.path()).unwrap().is_some());

        let missing = tmp.path().with_extension("gone");
        assert!(read_report(&missing).unwrap().is_none());
    }
}
