// src/exchange/signal.rs
//! Sticky wakeup signal shared between notification ingestion and the
//! completion detector.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A wakeup flag that stays raised until the waiter clears it.
///
/// `wait` registers interest before re-checking the flag, so a `raise` that
/// lands between a state snapshot and the suspend call is still observed on
/// the next check rather than lost.
#[derive(Debug, Default)]
pub struct StickySignal {
    raised: AtomicBool,
    notify: Notify,
}

impl StickySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake any waiter. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Clear the flag. The waiter calls this strictly before re-reading the
    /// state it is watching.
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Suspend until the signal is raised. Returns immediately if it already
    /// is.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}
