// src/lib.rs
pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod latency;
pub mod orchestrator;
pub mod utils;
pub mod webhooks;

// Re-export the orchestration core for easy access
pub use config::{Config, RunAction};
pub use dispatch::ThrottledDispatcher;
pub use error::PerfError;
pub use exchange::{
    CompletionDetector, ExchangeRole, ExchangeStateStore, StickySignal, TerminalStates,
};
pub use latency::{LatencyLedger, LatencySummary};
pub use orchestrator::{log_report, BatchOrchestrator, BatchPhase, BatchReport};
pub use webhooks::{NotificationProcessor, WebhookServer};
