// src/exchange/store.rs
//! Exchange state store: accumulates push notifications keyed by the peer's
//! opaque exchange id.

use crate::exchange::signal::StickySignal;
use crate::exchange::terminal::TerminalStates;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub notifications_ingested: u64,
    pub distinct_exchanges: usize,
}

/// Latest-known state per exchange id, plus the wake signal the completion
/// detector parks on. Ids are never removed during a run, so the total count
/// is monotonically non-decreasing.
#[derive(Debug, Default)]
pub struct ExchangeStateStore {
    states: DashMap<String, String>,
    signal: StickySignal,
    ingested: AtomicU64,
}

impl ExchangeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the latest state for an exchange and wake the detector.
    /// Raises the signal even when the label did not change, so a spuriously
    /// woken detector simply re-evaluates and goes back to waiting.
    pub fn ingest(&self, exchange_id: &str, state: &str) {
        self.states
            .insert(exchange_id.to_string(), state.to_string());
        self.ingested.fetch_add(1, Ordering::Relaxed);
        self.signal.raise();
    }

    /// `(pending, total)` under the given terminal predicate.
    ///
    /// Clears the wake flag before scanning and re-scans if an ingest landed
    /// mid-read, so the caller never goes to sleep on a stale snapshot.
    pub fn snapshot(&self, terminal: &TerminalStates) -> (usize, usize) {
        loop {
            self.signal.clear();
            let mut pending = 0usize;
            let mut total = 0usize;
            for entry in self.states.iter() {
                total += 1;
                if !terminal.is_terminal(entry.value()) {
                    pending += 1;
                }
            }
            if self.signal.is_raised() {
                continue;
            }
            return (pending, total);
        }
    }

    /// Suspend until the next ingest raises the signal.
    pub async fn await_progress(&self) {
        self.signal.wait().await;
    }

    /// Per-label counts, for end-of-batch reporting.
    pub fn state_counts(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for entry in self.states.iter() {
            *counts.entry(entry.value().clone()).or_default() += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            notifications_ingested: self.ingested.load(Ordering::Relaxed),
            distinct_exchanges: self.states.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::terminal::ExchangeRole;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn holder() -> TerminalStates {
        TerminalStates::for_role(ExchangeRole::Holder)
    }

    #[test]
    fn snapshot_counts_pending_and_total() {
        let store = ExchangeStateStore::new();
        store.ingest("ex-1", "offer_sent");
        store.ingest("ex-2", "done");
        store.ingest("ex-3", "request_received");
        assert_eq!(store.snapshot(&holder()), (2, 3));
    }

    #[test]
    fn ingest_is_last_write_wins_per_id() {
        let store = ExchangeStateStore::new();
        store.ingest("ex-1", "offer_sent");
        store.ingest("ex-1", "request_received");
        store.ingest("ex-1", "done");
        assert_eq!(store.snapshot(&holder()), (0, 1));
        assert_eq!(store.stats().notifications_ingested, 3);
        assert_eq!(store.stats().distinct_exchanges, 1);
    }

    #[test]
    fn duplicate_terminal_notification_is_a_safe_overwrite() {
        let store = ExchangeStateStore::new();
        store.ingest("ex-1", "done");
        store.ingest("ex-1", "done");
        assert_eq!(store.snapshot(&holder()), (0, 1));
    }

    #[test]
    fn unrecognized_labels_count_as_pending() {
        let store = ExchangeStateStore::new();
        store.ingest("ex-1", "mystery_state");
        assert_eq!(store.snapshot(&holder()), (1, 1));
    }

    #[tokio::test]
    async fn ingest_wakes_a_waiting_observer() {
        let store = Arc::new(ExchangeStateStore::new());
        // Drain the initial raise from a prior ingest.
        store.ingest("ex-0", "offer_sent");
        let _ = store.snapshot(&holder());

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.await_progress().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.ingest("ex-0", "offer_sent");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ingest must wake the observer even without a state change")
            .unwrap();
    }

    #[test]
    fn state_counts_groups_labels() {
        let store = ExchangeStateStore::new();
        store.ingest("ex-1", "done");
        store.ingest("ex-2", "done");
        store.ingest("ex-3", "abandoned");
        let counts = store.state_counts();
        assert_eq!(counts.get("done"), Some(&2));
        assert_eq!(counts.get("abandoned"), Some(&1));
    }
}
