// src/agent/connection.rs
//! Tracks the agent's pairwise connection as `connections` topic events
//! arrive.

use crate::error::PerfError;
use crate::exchange::signal::StickySignal;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;

/// Adopts the first connection the agent reports and signals once it goes
/// `active`. One runner connection per agent per run.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    connection_id: RwLock<Option<String>>,
    active: StickySignal,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a connection id known from an admin ack, ahead of any webhook.
    /// First writer wins.
    pub async fn prime(&self, connection_id: &str) {
        let mut adopted = self.connection_id.write().await;
        if adopted.is_none() {
            *adopted = Some(connection_id.to_string());
        }
    }

    /// Feed one `connections` topic event.
    pub async fn observe(&self, connection_id: &str, state: &str) {
        let mut adopted = self.connection_id.write().await;
        if adopted.is_none() && matches!(state, "invitation" | "request") {
            *adopted = Some(connection_id.to_string());
        }
        if adopted.as_deref() == Some(connection_id) && state == "active" {
            self.active.raise();
        }
    }

    pub async fn connection_id(&self) -> Option<String> {
        self.connection_id.read().await.clone()
    }

    /// Wait for the adopted connection to reach `active`.
    ///
    /// Awaiting before any invitation flow was started is a contract
    /// violation and fails immediately; a started flow that never activates
    /// fails after `wait`.
    pub async fn await_active(&self, wait: Duration) -> Result<String, PerfError> {
        let connection_id = self
            .connection_id
            .read()
            .await
            .clone()
            .ok_or(PerfError::NoConnection)?;
        timeout(wait, self.active.wait())
            .await
            .map_err(|_| PerfError::ConnectTimeout(wait.as_secs()))?;
        Ok(connection_id)
    }
}
