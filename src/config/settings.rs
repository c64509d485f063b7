// src/config/settings.rs
//! Runner configuration: CLI flags with environment fallbacks.

use crate::error::PerfError;
use clap::{Parser, ValueEnum};
use log::info;

/// Which exchange flow(s) the run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunAction {
    /// Credential issuance batch only
    Issue,
    /// Trust-ping batch only
    Ping,
    /// Presentation-request batch only (assumes credentials already held)
    Present,
    /// Credential batch followed by a presentation batch
    Full,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "aries-perf-bot",
    about = "Automated credential exchange performance runner"
)]
pub struct Config {
    /// Admin API base URL of the issuing/verifying agent
    #[arg(long, env = "ISSUER_ADMIN_URL", default_value = "http://127.0.0.1:8021")]
    pub issuer_admin_url: String,

    /// Admin API base URL of the holding/proving agent
    #[arg(long, env = "HOLDER_ADMIN_URL", default_value = "http://127.0.0.1:8031")]
    pub holder_admin_url: String,

    /// Port this runner listens on for issuer-side webhook notifications
    #[arg(long, env = "ISSUER_WEBHOOK_PORT", default_value_t = 8022)]
    pub issuer_webhook_port: u16,

    /// Port this runner listens on for holder-side webhook notifications
    #[arg(long, env = "HOLDER_WEBHOOK_PORT", default_value_t = 8032)]
    pub holder_webhook_port: u16,

    /// Number of exchanges to run per batch
    #[arg(short = 'c', long, env = "PERF_COUNT", default_value_t = 300)]
    pub count: usize,

    /// Number of exchange initiations kept concurrently in flight
    #[arg(short = 't', long = "threads", env = "PERF_THREADS", default_value_t = 10)]
    pub threads: usize,

    /// Flow to drive: issue, ping, present or full
    #[arg(long, value_enum, env = "PERF_ACTION", default_value_t = RunAction::Full)]
    pub action: RunAction,

    /// Seconds a single drain wait may block before the batch is failed
    #[arg(long, default_value_t = 30)]
    pub wait_timeout_secs: u64,

    /// Drain wait bound for presentation batches
    #[arg(long, default_value_t = 300)]
    pub present_wait_timeout_secs: u64,

    /// Seconds to wait for the agent connection to become active
    #[arg(long, default_value_t = 30)]
    pub connect_timeout_secs: u64,

    /// Optional pause between presentation-request sends, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub send_delay_ms: u64,

    /// Prefix for per-batch latency CSV artifacts
    #[arg(long, env = "PERF_CSV_PREFIX", default_value = "latency")]
    pub csv_prefix: String,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "PERF_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Reject unusable values before any network or filesystem I/O.
    pub fn validate(&self) -> Result<(), PerfError> {
        if self.count == 0 {
            return Err(PerfError::ConfigError(
                "count must be a positive integer".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(PerfError::ConfigError(
                "threads must be a positive integer".to_string(),
            ));
        }
        if self.wait_timeout_secs == 0 || self.present_wait_timeout_secs == 0 {
            return Err(PerfError::ConfigError(
                "wait timeouts must be positive".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(PerfError::ConfigError(
                "connect timeout must be positive".to_string(),
            ));
        }
        if self.csv_prefix.trim().is_empty() {
            return Err(PerfError::ConfigError(
                "csv prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_settings(&self) {
        info!(
            "Run configuration: action={:?} count={} threads={} issuer={} holder={}",
            self.action, self.count, self.threads, self.issuer_admin_url, self.holder_admin_url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn base_args() -> Vec<&'static str> {
        vec!["aries-perf-bot"]
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::parse_from(base_args());
        assert!(config.validate().is_ok());
        assert_eq!(config.count, 300);
        assert_eq!(config.threads, 10);
        assert_eq!(config.action, RunAction::Full);
    }

    #[test]
    fn zero_count_is_rejected() {
        let config = Config::parse_from(["aries-perf-bot", "--count", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_is_rejected() {
        let config = Config::parse_from(["aries-perf-bot", "--threads", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn action_parses_from_flag() {
        let config = Config::parse_from(["aries-perf-bot", "--action", "ping"]);
        assert_eq!(config.action, RunAction::Ping);
    }
}
