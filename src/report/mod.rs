// src/report/mod.rs

use tracing::debug;

pub mod coerce;
pub mod load;

/// A table lifted out of one section of the markdown report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names, in report order.
    pub headers: Vec<String>,
    /// Each data row, one cell per header.
    pub rows: Vec<Vec<String>>,
    /// Data lines rejected because their cell count didn't match the header.
    pub dropped_rows: usize,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Position of `name` in the header, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All cells of the named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }
}

/// Extract the pipe-delimited table that follows `start_marker` in `text`.
///
/// Capture starts on the line after the one containing `start_marker` (the
/// marker line itself is never part of the table) and stops at the line
/// containing `end_marker` when given, else at end of text. Blank lines and
/// heading lines are skipped; of the remaining lines containing `|`, the
/// first is the header, the second is the markdown separator row (discarded),
/// and the rest are data rows. A data row whose cell count doesn't match the
/// header is dropped and counted in [`Table::dropped_rows`].
///
/// An absent marker or empty text yields an empty `Table`; this never fails.
pub fn extract_table(text: &str, start_marker: &str, end_marker: Option<&str>) -> Table {
    let mut captured: Vec<&str> = Vec::new();
    let mut capture = false;

    for line in text.lines() {
        if !capture {
            if line.contains(start_marker) {
                capture = true;
            }
            continue;
        }
        if let Some(end) = end_marker {
            if line.contains(end) {
                break;
            }
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if line.contains('|') {
            captured.push(line);
        }
    }

    if captured.is_empty() {
        return Table::default();
    }

    let headers = split_cells(captured[0]);

    // captured[1] is the |---|---| separator row.
    let mut rows = Vec::with_capacity(captured.len().saturating_sub(2));
    let mut dropped_rows = 0;
    for line in captured.iter().skip(2) {
        let cells = split_cells(line);
        if cells.len() == headers.len() {
            rows.push(cells);
        } else {
            debug!(
                expected = headers.len(),
                got = cells.len(),
                line,
                "dropping malformed table row"
            );
            dropped_rows += 1;
        }
    }

    Table {
        headers,
        rows,
        dropped_rows,
    }
}

/// Split a table line on `|`, trimming each cell and discarding the empty
/// artifacts a leading/trailing separator produces.
fn split_cells(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|c| c.trim().to_string()).collect();
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}
