// src/utils/mod.rs
//! Shared helpers: logging bootstrap, wall-clock timestamps, phase timers

use log::info;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub fn setup_logging(level: &str) -> Result<(), fern::InitError> {
    let level = level.parse().unwrap_or(log::LevelFilter::Info);
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    info!("Logging initialized.");
    Ok(())
}

/// Seconds since the Unix epoch as a float, the unit the latency artifact
/// records.
pub fn unix_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Wall-clock phase timer that logs its label and elapsed seconds when
/// stopped. Logs on drop if the caller never stopped it.
pub struct LogTimer {
    label: String,
    started: Instant,
    stopped: bool,
}

impl LogTimer {
    pub fn start(label: &str) -> Self {
        Self {
            label: label.to_string(),
            started: Instant::now(),
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.stopped {
            self.stopped = true;
            info!("{} {:.2}s", self.label, elapsed.as_secs_f64());
        }
        elapsed
    }
}

impl Drop for LogTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}
