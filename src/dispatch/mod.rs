// src/dispatch/mod.rs
//! Throttled dispatcher: bounds the number of concurrently outstanding
//! exchange initiations.

use crate::error::PerfError;
use futures::future::BoxFuture;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Admits initiation commands through a counting semaphore. A command holds
/// one permit from admission until it settles, so at most `limit` commands
/// are in flight at any instant; admission order is FIFO.
pub struct ThrottledDispatcher {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl ThrottledDispatcher {
    /// `limit` must be at least 1; config validation enforces this upstream.
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by an in-flight initiation.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Block until a slot frees, then launch the initiation command without
    /// awaiting its acknowledgment.
    ///
    /// The slot is released exactly once, when the command settles. A failed
    /// command is logged and never propagates into the dispatch loop; the
    /// item simply never contributes a completion.
    pub async fn dispatch(
        &self,
        label: String,
        command: BoxFuture<'static, anyhow::Result<()>>,
    ) -> Result<(), PerfError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PerfError::Dispatch(format!("semaphore closed: {}", e)))?;
        tokio::spawn(async move {
            let result = command.await;
            drop(permit);
            match result {
                Ok(()) => debug!("{} acknowledged", label),
                Err(e) => warn!("{} failed: {:#}", label, e),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrency_never_exceeds_the_limit() {
        let limit = 3usize;
        let dispatcher = ThrottledDispatcher::new(limit);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for idx in 0..limit * 4 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            dispatcher
                .dispatch(
                    format!("cmd #{}", idx),
                    Box::pin(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
                .await
                .unwrap();
        }

        // All dispatches admitted; wait for the stragglers to settle.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(peak.load(Ordering::SeqCst) <= limit);
        assert_eq!(dispatcher.available(), limit);
    }

    #[tokio::test]
    async fn single_slot_serializes_commands() {
        let dispatcher = ThrottledDispatcher::new(1);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for idx in 0..5 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            dispatcher
                .dispatch(
                    format!("serial #{}", idx),
                    Box::pin(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_command_releases_its_slot() {
        let dispatcher = ThrottledDispatcher::new(1);
        dispatcher
            .dispatch(
                "doomed".to_string(),
                Box::pin(async { Err(anyhow::anyhow!("command channel rejected item")) }),
            )
            .await
            .unwrap();

        // A second dispatch must get the slot back despite the failure.
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.dispatch(
                "survivor".to_string(),
                Box::pin(async move {
                    ran_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            ),
        )
        .await
        .expect("slot must be released after a failure")
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.available(), 1);
    }
}
