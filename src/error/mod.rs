// src/error/mod.rs
//! Error taxonomy for the performance runner

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PerfError {
    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// The admin command channel rejected or errored on a request
    #[error("Admin Request Error: {0}")]
    AdminRequest(String),

    /// An admin response decoded but was missing expected fields
    #[error("Invalid Admin Response: {0}")]
    InvalidResponse(String),

    /// Webhook server failed to bind or serve
    #[error("Webhook Server Error: {0}")]
    WebhookServer(String),

    /// Awaited a connection that was never initiated
    #[error("No connection to await")]
    NoConnection,

    /// The connection did not reach `active` within the allowed window
    #[error("Connection not active after {0}s")]
    ConnectTimeout(u64),

    /// A drain wait exceeded its bound. Fatal to the batch.
    #[error("Completion timeout after {waited_secs}s ({reported}/{target} complete)")]
    CompletionTimeout {
        waited_secs: u64,
        reported: usize,
        target: usize,
    },

    /// The dispatcher could not admit a command
    #[error("Dispatch Error: {0}")]
    Dispatch(String),

    /// Latency artifact could not be written
    #[error("Export Error: {0}")]
    Export(String),

    /// Run cancelled by an external interrupt
    #[error("Interrupted")]
    Interrupted,

    /// Unknown/unclassified errors
    #[error("Unknown Error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for PerfError {
    fn from(e: reqwest::Error) -> Self {
        PerfError::AdminRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_timeout_message_carries_progress() {
        let err = PerfError::CompletionTimeout {
            waited_secs: 30,
            reported: 7,
            target: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("30s"));
        assert!(msg.contains("7/10"));
    }
}
