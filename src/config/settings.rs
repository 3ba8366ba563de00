//! Engine runtime settings
//!
//! Timing knobs for the playback loop and the real-time acquisition path.
//! All values have sensible defaults so a missing or partial settings file
//! still yields a working engine.

use crate::types::RelativeTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default engine loop cadence in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 25;

/// Real-time idle backoff bounds in milliseconds
pub const DEFAULT_IDLE_WAIT_MIN_MS: u64 = 10;
pub const DEFAULT_IDLE_WAIT_MAX_MS: u64 = 640;

/// Streaming read timeout clamp range in milliseconds
pub const DEFAULT_STREAM_TIMEOUT_MIN_MS: u64 = 100;
pub const DEFAULT_STREAM_TIMEOUT_MAX_MS: u64 = 10_000;

/// Runtime configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop cadence: yield sleep between engine iterations (ms)
    pub poll_interval_ms: u64,
    /// Lower bound of the real-time idle backoff (ms)
    pub idle_wait_min_ms: u64,
    /// Upper bound of the real-time idle backoff (ms)
    pub idle_wait_max_ms: u64,
    /// Optional fixed extra delay per real-time iteration to bound CPU (ms)
    pub extra_step_delay_ms: u64,
    /// Lower clamp of the streaming read timeout (ms)
    pub stream_timeout_min_ms: u64,
    /// Upper clamp of the streaming read timeout (ms)
    pub stream_timeout_max_ms: u64,
    /// Window duration used before the user picks one (seconds)
    pub default_duration_secs: f64,
    /// Smoothing factor for the update-rate readout, in (0, 1]
    pub rate_smoothing: f64,
    /// Address of the data service to offer for `OpenConnection`
    pub source_address: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            idle_wait_min_ms: DEFAULT_IDLE_WAIT_MIN_MS,
            idle_wait_max_ms: DEFAULT_IDLE_WAIT_MAX_MS,
            extra_step_delay_ms: 0,
            stream_timeout_min_ms: DEFAULT_STREAM_TIMEOUT_MIN_MS,
            stream_timeout_max_ms: DEFAULT_STREAM_TIMEOUT_MAX_MS,
            default_duration_secs: 60.0,
            rate_smoothing: 0.2,
            source_address: String::new(),
        }
    }
}

impl EngineConfig {
    /// The loop cadence as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The idle backoff bounds as `Duration`s
    pub fn idle_wait_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.idle_wait_min_ms),
            Duration::from_millis(self.idle_wait_max_ms.max(self.idle_wait_min_ms)),
        )
    }

    /// Streaming read timeout: `2 x duration`, clamped to the configured range
    pub fn stream_timeout(&self, duration: RelativeTime) -> Duration {
        let ms = (duration * 2.0 * 1000.0) as u64;
        Duration::from_millis(ms.clamp(
            self.stream_timeout_min_ms,
            self.stream_timeout_max_ms.max(self.stream_timeout_min_ms),
        ))
    }

    /// The optional per-iteration extra delay, if configured
    pub fn extra_step_delay(&self) -> Option<Duration> {
        (self.extra_step_delay_ms > 0).then(|| Duration::from_millis(self.extra_step_delay_ms))
    }
}
