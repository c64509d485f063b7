// src/webhooks/processor.rs
//! Routes webhook notifications into the per-kind exchange state stores.
//! One processor per agent role.

use crate::agent::connection::ConnectionTracker;
use crate::exchange::store::ExchangeStateStore;
use crate::webhooks::types::{
    ConnectionsPayload, CredentialExchangePayload, PingPayload, PresentationExchangePayload,
};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const PING_COMMENT_PREFIX: &str = "test-ping";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessorStats {
    pub total_notifications: u64,
    pub connection_events: u64,
    pub credential_events: u64,
    pub presentation_events: u64,
    pub ping_events: u64,
    pub skipped_malformed: u64,
    pub ignored_topics: u64,
}

/// Per-agent notification sink. Owns the exchange state stores the
/// completion detectors read, the connection tracker, and the register of
/// pings this runner sent.
pub struct NotificationProcessor {
    label: String,
    pub connections: Arc<ConnectionTracker>,
    pub credentials: Arc<ExchangeStateStore>,
    pub presentations: Arc<ExchangeStateStore>,
    pub pings: Arc<ExchangeStateStore>,
    sent_pings: RwLock<HashSet<String>>,
    stats: RwLock<ProcessorStats>,
}

impl NotificationProcessor {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            connections: Arc::new(ConnectionTracker::new()),
            credentials: Arc::new(ExchangeStateStore::new()),
            presentations: Arc::new(ExchangeStateStore::new()),
            pings: Arc::new(ExchangeStateStore::new()),
            sent_pings: RwLock::new(HashSet::new()),
            stats: RwLock::new(ProcessorStats::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Remember a ping thread this runner initiated, so its notifications
    /// pass the ingest filter.
    pub async fn register_sent_ping(&self, thread_id: String) {
        self.sent_pings.write().await.insert(thread_id);
    }

    pub async fn stats(&self) -> ProcessorStats {
        self.stats.read().await.clone()
    }

    /// Ingest one pushed notification. Malformed payloads are logged and
    /// skipped; this path never fails back to the peer.
    pub async fn process(&self, topic: &str, payload: &Value) {
        self.stats.write().await.total_notifications += 1;
        match topic {
            "connections" => self.process_connections(payload).await,
            "issue_credential_v2_0" => self.process_credential(payload).await,
            "present_proof_v2_0" => self.process_presentation(payload).await,
            "ping" => self.process_ping(payload).await,
            other => {
                debug!("{}: ignoring webhook topic {}", self.label, other);
                self.stats.write().await.ignored_topics += 1;
            }
        }
    }

    async fn process_connections(&self, payload: &Value) {
        let parsed: ConnectionsPayload = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => return self.skip_malformed("connections", &e.to_string()).await,
        };
        let (connection_id, state) = match (parsed.connection_id, parsed.state) {
            (Some(id), Some(state)) => (id, state),
            _ => {
                return self
                    .skip_malformed("connections", "missing connection_id or state")
                    .await
            }
        };
        self.connections.observe(&connection_id, &state).await;
        self.stats.write().await.connection_events += 1;
    }

    async fn process_credential(&self, payload: &Value) {
        let parsed: CredentialExchangePayload = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return self
                    .skip_malformed("issue_credential_v2_0", &e.to_string())
                    .await
            }
        };
        match (parsed.cred_ex_id, parsed.state) {
            (Some(id), Some(state)) => {
                self.credentials.ingest(&id, &state);
                self.stats.write().await.credential_events += 1;
            }
            _ => {
                self.skip_malformed("issue_credential_v2_0", "missing cred_ex_id or state")
                    .await
            }
        }
    }

    async fn process_presentation(&self, payload: &Value) {
        let parsed: PresentationExchangePayload = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return self
                    .skip_malformed("present_proof_v2_0", &e.to_string())
                    .await
            }
        };
        match (parsed.pres_ex_id, parsed.state) {
            (Some(id), Some(state)) => {
                self.presentations.ingest(&id, &state);
                self.stats.write().await.presentation_events += 1;
            }
            _ => {
                self.skip_malformed("present_proof_v2_0", "missing pres_ex_id or state")
                    .await
            }
        }
    }

    /// Only pings this runner sent (or echo-side `received` events carrying
    /// the runner's comment prefix) are tracked; unrelated pings on the
    /// connection stay out of the completion math.
    async fn process_ping(&self, payload: &Value) {
        let parsed: PingPayload = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => return self.skip_malformed("ping", &e.to_string()).await,
        };
        let (thread_id, state) = match (parsed.thread_id, parsed.state) {
            (Some(id), Some(state)) => (id, state),
            _ => return self.skip_malformed("ping", "missing thread_id or state").await,
        };
        let known = self.sent_pings.read().await.contains(&thread_id);
        let echo = state == "received"
            && parsed
                .comment
                .as_deref()
                .map(|c| c.starts_with(PING_COMMENT_PREFIX))
                .unwrap_or(false);
        if known || echo {
            self.pings.ingest(&thread_id, &state);
            self.stats.write().await.ping_events += 1;
        } else {
            debug!("{}: ignoring unrelated ping thread {}", self.label, thread_id);
        }
    }

    async fn skip_malformed(&self, topic: &str, reason: &str) {
        warn!("{}: skipping malformed {} notification: {}", self.label, topic, reason);
        self.stats.write().await.skipped_malformed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn credential_notification_lands_in_the_store() {
        let processor = NotificationProcessor::new("holder");
        processor
            .process(
                "issue_credential_v2_0",
                &json!({ "cred_ex_id": "cred-1", "state": "done" }),
            )
            .await;
        assert_eq!(processor.credentials.len(), 1);
        assert_eq!(processor.stats().await.credential_events, 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped_not_fatal() {
        let processor = NotificationProcessor::new("holder");
        processor
            .process("issue_credential_v2_0", &json!({ "state": "done" }))
            .await;
        processor.process("connections", &json!({})).await;
        assert!(processor.credentials.is_empty());
        let stats = processor.stats().await;
        assert_eq!(stats.skipped_malformed, 2);
        assert_eq!(stats.total_notifications, 2);
    }

    #[tokio::test]
    async fn unknown_topics_are_counted_and_ignored() {
        let processor = NotificationProcessor::new("issuer");
        processor
            .process("basicmessages", &json!({ "content": "hi" }))
            .await;
        assert_eq!(processor.stats().await.ignored_topics, 1);
    }

    #[tokio::test]
    async fn ping_filter_admits_registered_threads() {
        let processor = NotificationProcessor::new("issuer");
        processor.register_sent_ping("t-1".to_string()).await;
        processor
            .process(
                "ping",
                &json!({ "thread_id": "t-1", "state": "response_received" }),
            )
            .await;
        processor
            .process(
                "ping",
                &json!({ "thread_id": "t-stranger", "state": "response_received" }),
            )
            .await;
        assert_eq!(processor.pings.len(), 1);
    }

    #[tokio::test]
    async fn ping_filter_admits_prefixed_echoes() {
        let processor = NotificationProcessor::new("holder");
        processor
            .process(
                "ping",
                &json!({
                    "thread_id": "t-2",
                    "state": "received",
                    "comment": "test-ping 2",
                }),
            )
            .await;
        assert_eq!(processor.pings.len(), 1);
    }

    #[tokio::test]
    async fn connection_events_feed_the_tracker() {
        let processor = NotificationProcessor::new("issuer");
        processor
            .process(
                "connections",
                &json!({ "connection_id": "conn-1", "state": "invitation" }),
            )
            .await;
        processor
            .process(
                "connections",
                &json!({ "connection_id": "conn-1", "state": "active" }),
            )
            .await;
        let id = processor
            .connections
            .await_active(std::time::Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(id, "conn-1");
    }
}
