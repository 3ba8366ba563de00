//! DataSource trait for the remote time-series service
//!
//! This module provides a common trait for data-source implementations,
//! enabling both a real service client and a simulated source for tests
//! and demos. The playback engine only ever talks to `dyn DataSource`.

pub mod mock;

pub use mock::{SimulatedSource, WavePattern};

use crate::error::Result;
use crate::types::{ChannelId, FetchMode, RelativeTime, SampleBatch, TimeLimits};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Statistics for data-source operations
///
/// Tracks success rates and timing for fetches and stream reads.
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    /// Total number of successful fetches/stream reads
    pub successful_fetches: u64,
    /// Total number of failed fetches/stream reads
    pub failed_fetches: u64,
    /// Total fetch time in microseconds
    pub total_fetch_time_us: u64,
    /// Last fetch time in microseconds
    pub last_fetch_time_us: u64,
    /// Total samples delivered
    pub total_samples: u64,
}

impl SourceStats {
    /// Average fetch time in microseconds
    pub fn avg_fetch_time_us(&self) -> f64 {
        if self.successful_fetches == 0 {
            0.0
        } else {
            self.total_fetch_time_us as f64 / self.successful_fetches as f64
        }
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_fetches + self.failed_fetches;
        if total == 0 {
            100.0
        } else {
            (self.successful_fetches as f64 / total as f64) * 100.0
        }
    }

    /// Record a successful fetch
    pub fn record_success(&mut self, time_us: u64, samples: u64) {
        self.successful_fetches += 1;
        self.total_fetch_time_us += time_us;
        self.last_fetch_time_us = time_us;
        self.total_samples += samples;
    }

    /// Record a failed fetch
    pub fn record_failure(&mut self) {
        self.failed_fetches += 1;
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Unified interface to the remote time-series service
///
/// Implementations must be `Send`: the engine owns its source and runs on
/// its own thread. All calls are synchronous; timeouts are local to the
/// streaming reads and never propagate as engine-wide failures.
pub trait DataSource: Send {
    /// Open a connection to the service at `address`
    ///
    /// Returns `Ok(false)` when the service refuses the connection without
    /// a transport error; the engine surfaces either outcome as a status
    /// and stays idle.
    fn open(&mut self, address: &str) -> Result<bool>;

    /// Release the connection
    fn close(&mut self);

    /// Whether a connection is currently open
    fn is_open(&self) -> bool;

    /// List channels matching a glob-style pattern
    fn list_channels(&mut self, pattern: &str) -> Result<BTreeSet<ChannelId>>;

    /// Query the earliest/latest known sample times per channel
    fn time_limits(&mut self, channels: &[ChannelId]) -> Result<HashMap<ChannelId, TimeLimits>>;

    /// Discrete request/response fetch
    ///
    /// With [`FetchMode::Absolute`] the window is `[start, start+duration)`;
    /// with `Oldest`/`Newest` the service anchors the window itself and
    /// `start` is ignored. Channels with no data in the window are absent
    /// from the returned batch (or mapped to an empty vector).
    fn fetch(
        &mut self,
        channels: &[ChannelId],
        start: f64,
        duration: RelativeTime,
        mode: FetchMode,
    ) -> Result<SampleBatch>;

    /// Start a continuous streaming subscription anchored at "newest"
    ///
    /// Returns the first batch, or `None` when nothing arrived within
    /// `timeout`. The subscription stays active until [`end_stream`]
    /// (or a failed read) regardless of the first batch.
    ///
    /// [`end_stream`]: DataSource::end_stream
    fn begin_stream(
        &mut self,
        channels: &[ChannelId],
        duration: RelativeTime,
        timeout: Duration,
    ) -> Result<Option<SampleBatch>>;

    /// Read the next batch from an active subscription
    ///
    /// Returns `None` when no new data arrived within `timeout`.
    fn read_stream(&mut self, timeout: Duration) -> Result<Option<SampleBatch>>;

    /// Tear down the streaming subscription, if any
    fn end_stream(&mut self);

    /// Operation statistics
    fn stats(&self) -> &SourceStats;

    /// Mutable access to the statistics
    fn stats_mut(&mut self) -> &mut SourceStats;

    /// Reset the statistics
    fn reset_stats(&mut self) {
        self.stats_mut().reset();
    }
}
