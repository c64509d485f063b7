// src/exchange/detector.rs
//! Completion detector: converts state-store snapshots into a monotonically
//! increasing completed count and stamps latency ends for newly completed
//! ordinal ranks.

use crate::error::PerfError;
use crate::exchange::store::ExchangeStateStore;
use crate::exchange::terminal::TerminalStates;
use crate::latency::LatencyLedger;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct CompletionDetector {
    store: Arc<ExchangeStateStore>,
    terminal: TerminalStates,
    wait_timeout: Duration,
}

impl CompletionDetector {
    pub fn new(
        store: Arc<ExchangeStateStore>,
        terminal: TerminalStates,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            store,
            terminal,
            wait_timeout,
        }
    }

    /// Current `(pending, total)` snapshot under this detector's predicate.
    pub fn poll_once(&self) -> (usize, usize) {
        self.store.snapshot(&self.terminal)
    }

    /// Suspend until the store signals the next ingest.
    pub async fn await_progress(&self) {
        self.store.await_progress().await;
    }

    pub fn state_counts(&self) -> HashMap<String, usize> {
        self.store.state_counts()
    }

    /// Drive the consumption loop until `target` exchanges have reached a
    /// terminal state.
    ///
    /// The completed count only ever advances; newly completed ordinal ranks
    /// `reported+1 ..= complete` are assigned latency ends as a block. Each
    /// wait is bounded by the configured timeout, and exceeding it fails the
    /// batch.
    pub async fn drain(
        &self,
        target: usize,
        ledger: Arc<LatencyLedger>,
    ) -> Result<usize, PerfError> {
        let mut reported = 0usize;
        loop {
            let (pending, total) = self.poll_once();
            let complete = total.saturating_sub(pending);
            if complete <= reported {
                timeout(self.wait_timeout, self.store.await_progress())
                    .await
                    .map_err(|_| PerfError::CompletionTimeout {
                        waited_secs: self.wait_timeout.as_secs(),
                        reported,
                        target,
                    })?;
                continue;
            }
            for index in reported + 1..=complete {
                ledger.mark_end(index).await;
            }
            debug!(
                "drain progress: {}/{} complete ({} known)",
                complete, target, total
            );
            reported = complete;
            if reported >= target {
                return Ok(reported);
            }
        }
    }
}
