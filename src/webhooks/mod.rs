// src/webhooks/mod.rs
//! Webhook integration: the push notification channel from the peer agents.
//!
//! This module provides:
//! - An axum server receiving per-topic notifications
//! - Payload types for the topics the runner consumes
//! - A processor routing notifications into the exchange state stores

pub mod processor;
pub mod server;
pub mod types;

pub use processor::{NotificationProcessor, ProcessorStats};
pub use server::{BoundWebhookServer, WebhookServer, WebhookState};
pub use types::*;
