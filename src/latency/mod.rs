// src/latency/mod.rs
//! Per-item latency ledger: start/end timestamps keyed by dispatch index,
//! CSV export and summary statistics.

use crate::error::PerfError;
use crate::utils::unix_ts;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub const CSV_HEADER: &str = "index,start_ts,end_ts,latency_seconds";

#[derive(Debug, Clone, Copy)]
pub struct LatencyRecord {
    pub start: f64,
    pub end: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub avg_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

/// Append-only start/end timestamp store. A record whose end was never set
/// is in flight or lost; it is excluded from export and summaries.
#[derive(Debug, Default)]
pub struct LatencyLedger {
    records: RwLock<BTreeMap<usize, LatencyRecord>>,
}

impl LatencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dispatch timestamp for an index. Overwrites any prior
    /// record; an index is not reissued within one run.
    pub async fn mark_start(&self, index: usize) {
        self.mark_start_at(index, unix_ts()).await;
    }

    pub async fn mark_start_at(&self, index: usize, ts: f64) {
        self.records
            .write()
            .await
            .insert(index, LatencyRecord { start: ts, end: None });
    }

    /// Record the completion timestamp for an index. Write-once: a no-op if
    /// no start exists or an end was already recorded.
    pub async fn mark_end(&self, index: usize) {
        self.mark_end_at(index, unix_ts()).await;
    }

    pub async fn mark_end_at(&self, index: usize, ts: f64) {
        if let Some(record) = self.records.write().await.get_mut(&index) {
            if record.end.is_none() {
                record.end = Some(ts);
            }
        }
    }

    pub async fn record(&self, index: usize) -> Option<LatencyRecord> {
        self.records.read().await.get(&index).copied()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of records whose end has been stamped.
    pub async fn completed(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.end.is_some())
            .count()
    }

    /// Mean/min/max over completed records; `None` when nothing completed.
    pub async fn summarize(&self) -> Option<LatencySummary> {
        let records = self.records.read().await;
        let latencies: Vec<f64> = records
            .values()
            .filter_map(|r| r.end.map(|end| end - r.start))
            .collect();
        if latencies.is_empty() {
            return None;
        }
        let count = latencies.len();
        let sum: f64 = latencies.iter().sum();
        let min = latencies.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = latencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(LatencySummary {
            count,
            avg_secs: sum / count as f64,
            min_secs: min,
            max_secs: max,
        })
    }

    /// Write completed records as CSV, sorted by index. Records still in
    /// flight are skipped silently.
    pub async fn export_csv(&self, path: &Path) -> Result<PathBuf, PerfError> {
        let records = self.records.read().await;
        let file = File::create(path)
            .map_err(|e| PerfError::Export(format!("create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", CSV_HEADER)
            .map_err(|e| PerfError::Export(format!("write {}: {}", path.display(), e)))?;
        for (index, record) in records.iter() {
            let end = match record.end {
                Some(end) => end,
                None => continue,
            };
            writeln!(
                writer,
                "{},{:?},{:?},{:?}",
                index,
                record.start,
                end,
                end - record.start
            )
            .map_err(|e| PerfError::Export(format!("write {}: {}", path.display(), e)))?;
        }
        writer
            .flush()
            .map_err(|e| PerfError::Export(format!("flush {}: {}", path.display(), e)))?;
        let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        info!("Latency CSV saved as {}", abs.display());
        Ok(abs)
    }
}
