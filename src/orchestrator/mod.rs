// src/orchestrator/mod.rs
//! Batch orchestrator: drives one batch of exchanges end to end and reports
//! latency and throughput.

use crate::dispatch::ThrottledDispatcher;
use crate::error::PerfError;
use crate::exchange::detector::CompletionDetector;
use crate::latency::{LatencyLedger, LatencySummary};
use futures::future::BoxFuture;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Lifecycle of a batch. Dispatching and Draining describe the
/// orchestrator's own activity; the drain task runs concurrently from the
/// first dispatch onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchPhase {
    Idle,
    Dispatching,
    Draining,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub label: String,
    pub size: usize,
    pub completed: usize,
    pub duration_secs: f64,
    pub throughput_per_sec: f64,
    pub latency: Option<LatencySummary>,
    pub state_counts: HashMap<String, usize>,
}

/// One orchestrator per batch. Owns the batch's latency ledger and its
/// dispatcher; a later batch that depends on this one starts only after this
/// batch's report has been observed by the caller.
pub struct BatchOrchestrator {
    label: String,
    size: usize,
    dispatcher: ThrottledDispatcher,
    ledger: Arc<LatencyLedger>,
    phase: RwLock<BatchPhase>,
    send_delay: Option<Duration>,
}

impl BatchOrchestrator {
    pub fn new(label: &str, size: usize, concurrency: usize) -> Self {
        Self {
            label: label.to_string(),
            size,
            dispatcher: ThrottledDispatcher::new(concurrency),
            ledger: Arc::new(LatencyLedger::new()),
            phase: RwLock::new(BatchPhase::Idle),
            send_delay: None,
        }
    }

    /// Insert a pause between consecutive sends, to avoid overwhelming the
    /// peer on request kinds that fan out heavy work.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.send_delay = Some(delay);
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ledger(&self) -> Arc<LatencyLedger> {
        self.ledger.clone()
    }

    pub async fn phase(&self) -> BatchPhase {
        *self.phase.read().await
    }

    /// Run the batch: spawn the detector drain, then issue all dispatches
    /// (start timestamps recorded before slot acquisition), then await the
    /// drain. A ctrl-c abandons the drain; in-flight initiations run to
    /// settlement on their own tasks, and the partial ledger remains
    /// exportable through `export_csv`.
    pub async fn run<F>(
        &self,
        detector: &CompletionDetector,
        mut send: F,
    ) -> Result<BatchReport, PerfError>
    where
        F: FnMut(usize) -> BoxFuture<'static, anyhow::Result<()>>,
    {
        *self.phase.write().await = BatchPhase::Dispatching;
        let started = Instant::now();
        let drain = tokio::spawn({
            let detector = detector.clone();
            let ledger = self.ledger.clone();
            let target = self.size;
            async move { detector.drain(target, ledger).await }
        });

        for index in 1..=self.size {
            self.ledger.mark_start(index).await;
            let command = send(index);
            if let Err(e) = self
                .dispatcher
                .dispatch(format!("{} #{}", self.label, index), command)
                .await
            {
                drain.abort();
                return Err(e);
            }
            if let Some(delay) = self.send_delay {
                tokio::time::sleep(delay).await;
            }
        }
        info!(
            "Done starting {} {} exchanges in {:.2}s",
            self.size,
            self.label,
            started.elapsed().as_secs_f64()
        );
        *self.phase.write().await = BatchPhase::Draining;

        let drain_abort = drain.abort_handle();
        let completed = tokio::select! {
            result = drain => match result {
                Ok(Ok(completed)) => completed,
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(PerfError::Unknown(format!("drain task failed: {}", e))),
            },
            _ = tokio::signal::ctrl_c() => {
                // The drain is cancelled; in-flight initiations are not, and
                // run to settlement on their own tasks.
                warn!("Interrupt received, abandoning {} batch", self.label);
                drain_abort.abort();
                return Err(PerfError::Interrupted);
            }
        };

        *self.phase.write().await = BatchPhase::Done;
        let duration = started.elapsed();
        let secs = duration.as_secs_f64();
        Ok(BatchReport {
            label: self.label.clone(),
            size: self.size,
            completed,
            duration_secs: secs,
            throughput_per_sec: if secs > 0.0 {
                completed as f64 / secs
            } else {
                0.0
            },
            latency: self.ledger.summarize().await,
            state_counts: detector.state_counts(),
        })
    }

    pub async fn export_csv(&self, path: &Path) -> Result<PathBuf, PerfError> {
        self.ledger.export_csv(path).await
    }
}

/// Console summary for one finished batch.
pub fn log_report(report: &BatchReport) {
    info!(
        "✅ Completed {}/{} {} exchanges in {:.2}s ({:.2}/s)",
        report.completed,
        report.size,
        report.label,
        report.duration_secs,
        report.throughput_per_sec
    );
    match &report.latency {
        Some(summary) => {
            info!("Average latency: {:.3}s", summary.avg_secs);
            info!("Min latency: {:.3}s", summary.min_secs);
            info!("Max latency: {:.3}s", summary.max_secs);
        }
        None => info!("No completed latency entries to summarize."),
    }
    for (state, count) in &report.state_counts {
        info!("   state {}: {}", state, count);
    }
}
