// src/report/coerce.rs

use anyhow::{bail, Context, Result};

use crate::report::Table;

/// Per-column policy for turning report text into numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coercion {
    /// Any unparseable cell aborts the load of the whole table.
    Strict,
    /// An unparseable cell becomes a missing value and the load continues.
    Lenient,
}

/// Coerce the named column to numbers under `coercion`.
///
/// A missing column is an error under either policy. Cells that parse to a
/// non-finite value count as coercion failures; a latency or load sample is
/// only usable if it is a real number.
pub fn numeric_column(
    table: &Table,
    name: &str,
    coercion: Coercion,
) -> Result<Vec<Option<f64>>> {
    let idx = table
        .column_index(name)
        .with_context(|| format!("column '{}' not found in table", name))?;

    let mut out = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let raw = row[idx].as_str();
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => out.push(Some(v)),
            _ => match coercion {
                Coercion::Strict => {
                    bail!("column '{}' row {}: '{}' is not numeric", name, row_idx, raw)
                }
                Coercion::Lenient => out.push(None),
            },
        }
    }
    Ok(out)
}

/// Strictly coerce the named column; every cell must be numeric.
pub fn required_numeric_column(table: &Table, name: &str) -> Result<Vec<f64>> {
    Ok(numeric_column(table, name, Coercion::Strict)?
        .into_iter()
        .flatten()
        .collect())
}
