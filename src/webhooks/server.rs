// src/webhooks/server.rs
//! Webhook server receiving push notifications from a cloud agent.

use crate::error::PerfError;
use crate::webhooks::processor::NotificationProcessor;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use log::{debug, info};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub processor: Arc<NotificationProcessor>,
}

/// Webhook server for one agent's notification stream.
pub struct WebhookServer {
    port: u16,
    state: WebhookState,
}

impl WebhookServer {
    pub fn new(port: u16, processor: Arc<NotificationProcessor>) -> Self {
        Self {
            port,
            state: WebhookState { processor },
        }
    }

    /// Bind the listen socket, surfacing bind errors to the caller before
    /// the server is spawned.
    pub async fn bind(self) -> Result<BoundWebhookServer, PerfError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PerfError::WebhookServer(format!("bind {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| PerfError::WebhookServer(e.to_string()))?;
        info!(
            "🚀 Webhook server for {} listening on {}",
            self.state.processor.label(),
            local_addr
        );
        Ok(BoundWebhookServer {
            listener,
            router: self.router(),
            local_addr,
        })
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/topic/:topic", post(handle_topic))
            .route("/topic/:topic/", post(handle_topic))
            .with_state(self.state.clone())
    }
}

pub struct BoundWebhookServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl BoundWebhookServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process exits; run this on its own task.
    pub async fn serve(self) -> Result<(), PerfError> {
        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| PerfError::WebhookServer(e.to_string()))
    }
}

/// Per-topic notification handler. Always acks: a payload the processor
/// cannot use is logged and skipped, never bounced back to the agent.
async fn handle_topic(
    State(state): State<WebhookState>,
    Path(topic): Path<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    debug!("📡 webhook topic={} for {}", topic, state.processor.label());
    state.processor.process(&topic, &payload).await;
    Json(json!({
        "status": "ok",
        "topic": topic,
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "aries-perf-bot",
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let processor = Arc::new(NotificationProcessor::new("issuer"));
        let bound = WebhookServer::new(0, processor).bind().await.unwrap();
        assert_ne!(bound.local_addr().port(), 0);
    }
}
