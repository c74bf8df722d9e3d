// src/dashboard/mod.rs

use serde::Serialize;

use crate::report::load::{BatchRecord, DetailRecord, OPERATIONS};
use crate::trend::{self, TrendProjection, LATENCY_THRESHOLD_MS};

/// Headline numbers for the batch progression section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Largest batch size that still passed; `None` when every batch failed.
    pub max_stable_users: Option<u32>,
    pub peak_latency_ms: f64,
    pub batches_run: usize,
}

/// Batch scalability section: headline metrics, the observed points, and
/// the fitted trend when enough batches exist.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSection {
    pub summary: BatchSummary,
    /// Observed `(batch size, max latency)` points, in report order.
    pub observed: Vec<(f64, f64)>,
    pub threshold_ms: f64,
    pub trend: Option<TrendProjection>,
}

/// Five-number summary plus mean for one operation's latencies.
#[derive(Debug, Clone, Serialize)]
pub struct OpStats {
    pub operation: String,
    pub samples: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

/// Detailed metrics section for the last batch.
#[derive(Debug, Clone, Serialize)]
pub struct DetailSection {
    pub users: usize,
    pub stats: Vec<OpStats>,
    /// Raw per-user rows, kept for the data table and breakdown chart.
    pub rows: Vec<DetailRecord>,
}

/// Everything the dashboard shows, computed fresh on every report load.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// `None` when the batch progression table held no data.
    pub batch: Option<BatchSection>,
    /// `None` when the detailed metrics table held no data.
    pub detail: Option<DetailSection>,
}

pub fn build(batches: &[BatchRecord], details: &[DetailRecord]) -> Dashboard {
    let batch = if batches.is_empty() {
        None
    } else {
        let xs: Vec<f64> = batches.iter().map(|b| b.batch_size as f64).collect();
        let ys: Vec<f64> = batches.iter().map(|b| b.max_latency_ms).collect();
        let max_stable_users = batches
            .iter()
            .filter(|b| b.passed())
            .map(|b| b.batch_size)
            .max();
        let peak_latency_ms = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(BatchSection {
            summary: BatchSummary {
                max_stable_users,
                peak_latency_ms,
                batches_run: batches.len(),
            },
            observed: xs.iter().copied().zip(ys.iter().copied()).collect(),
            threshold_ms: LATENCY_THRESHOLD_MS,
            trend: trend::project(&xs, &ys),
        })
    };

    let detail = if details.is_empty() {
        None
    } else {
        Some(DetailSection {
            users: details.len(),
            stats: op_stats(details),
            rows: details.to_vec(),
        })
    };

    Dashboard { batch, detail }
}

/// Latency distribution per operation over the non-missing samples.
/// Operations with no samples at all are left out.
fn op_stats(details: &[DetailRecord]) -> Vec<OpStats> {
    OPERATIONS
        .iter()
        .filter_map(|&op| {
            let mut samples: Vec<f64> = details
                .iter()
                .filter_map(|d| d.latencies.get(op).copied().flatten())
                .collect();
            if samples.is_empty() {
                return None;
            }
            samples.sort_by(f64::total_cmp);
            let mean = samples.iter().sum::<f64>() / samples.len() as f64;
            Some(OpStats {
                operation: op.to_string(),
                samples: samples.len(),
                min: samples[0],
                q1: quantile(&samples, 0.25),
                median: quantile(&samples, 0.5),
                q3: quantile(&samples, 0.75),
                max: samples[samples.len() - 1],
                mean,
            })
        })
        .collect()
}

/// Linear-interpolation quantile over sorted samples.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
