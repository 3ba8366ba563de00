//! Simulated data source for tests and demos
//!
//! This module provides a [`DataSource`] implementation backed by synthetic
//! waveform channels over a bounded archive range, so the playback engine
//! can be exercised without a real service. Error paths (refused
//! connections, failing fetches, starved streams) are switchable per
//! instance for tests.
//!
//! # Waveform Patterns
//!
//! - [`WavePattern::Constant`] - fixed value
//! - [`WavePattern::Sine`] - sinusoid with configurable frequency/amplitude
//! - [`WavePattern::Ramp`] - linear slope
//! - [`WavePattern::Square`] - alternating two-level wave
//! - [`WavePattern::Noise`] - pseudo-random values within a range

use crate::error::{Result, TimescopeError};
use crate::source::{DataSource, SourceStats};
use crate::types::{ChannelId, FetchMode, RelativeTime, Sample, SampleBatch, TimeLimits};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// Pattern for generating synthetic channel data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WavePattern {
    /// Constant value
    Constant(f64),
    /// Sine wave
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Linear ramp
    Ramp { slope: f64, offset: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
    /// Pseudo-random values within a range
    Noise { min: f64, max: f64 },
}

impl Default for WavePattern {
    fn default() -> Self {
        WavePattern::Sine {
            frequency: 0.1,
            amplitude: 1.0,
            offset: 0.0,
        }
    }
}

impl WavePattern {
    /// Sample the pattern at absolute time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        match *self {
            WavePattern::Constant(v) => v,
            WavePattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin(),
            WavePattern::Ramp { slope, offset } => offset + slope * t,
            WavePattern::Square { period, amplitude } => {
                if (t % period) < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            WavePattern::Noise { min, max } => min + rand_simple() * (max - min),
        }
    }
}

/// Simple pseudo-random number generator (no external dependency)
fn rand_simple() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = Cell::new(12345);
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f64) / (u64::MAX as f64)
    })
}

/// A simulated archive of waveform channels implementing [`DataSource`]
#[derive(Debug)]
pub struct SimulatedSource {
    channels: BTreeMap<ChannelId, WavePattern>,
    archive: TimeLimits,
    sample_period: f64,
    open: bool,
    stream: Option<StreamState>,
    stats: SourceStats,

    /// When true, `open` returns `Ok(false)` (service refused)
    pub refuse_open: bool,
    /// When true, fetches and bounds queries fail with an error
    pub fail_fetches: bool,
    /// When true, the first stream batch covers less than the requested
    /// duration, triggering the engine's polling fallback
    pub starve_stream: bool,
    /// Seconds of new "live" data appended per stream read or newest fetch
    pub advance_per_read: f64,
}

#[derive(Debug)]
struct StreamState {
    channels: Vec<ChannelId>,
    duration: RelativeTime,
}

impl SimulatedSource {
    /// Create a source with an hour-long archive and no channels
    pub fn new() -> Self {
        Self {
            channels: BTreeMap::new(),
            archive: TimeLimits {
                earliest: 1_000_000.0,
                latest: 1_003_600.0,
            },
            sample_period: 1.0,
            open: false,
            stream: None,
            stats: SourceStats::default(),
            refuse_open: false,
            fail_fetches: false,
            starve_stream: false,
            advance_per_read: 0.0,
        }
    }

    /// Add a synthetic channel
    pub fn with_channel(mut self, name: impl Into<ChannelId>, pattern: WavePattern) -> Self {
        self.channels.insert(name.into(), pattern);
        self
    }

    /// Set the archived time range
    pub fn with_archive(mut self, earliest: f64, latest: f64) -> Self {
        self.archive = TimeLimits { earliest, latest };
        self
    }

    /// Set the sample spacing in seconds
    pub fn with_sample_period(mut self, period: f64) -> Self {
        self.sample_period = period.max(1e-6);
        self
    }

    /// The current archived range
    pub fn archive(&self) -> TimeLimits {
        self.archive
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(TimescopeError::Connection("not connected".to_string()))
        }
    }

    fn generate(&self, channels: &[ChannelId], start: f64, duration: RelativeTime) -> SampleBatch {
        let lo = start.max(self.archive.earliest);
        let hi = (start + duration).min(self.archive.latest);

        let mut batch = SampleBatch::new();
        for name in channels {
            let Some(pattern) = self.channels.get(name) else {
                continue;
            };
            let mut samples = Vec::new();
            // Align to the sample grid so repeated fetches are stable.
            let mut t = (lo / self.sample_period).ceil() * self.sample_period;
            while t <= hi {
                samples.push(Sample::new(t, pattern.value_at(t)));
                t += self.sample_period;
            }
            batch.insert(name.clone(), samples);
        }
        batch
    }

    fn newest_window(&self, duration: RelativeTime) -> (f64, RelativeTime) {
        (self.archive.latest - duration, duration)
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for SimulatedSource {
    fn open(&mut self, address: &str) -> Result<bool> {
        if self.refuse_open {
            tracing::debug!(address, "simulated source: connection refused");
            return Ok(false);
        }
        self.open = true;
        tracing::debug!(address, "simulated source: connected");
        Ok(true)
    }

    fn close(&mut self) {
        self.stream = None;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn list_channels(&mut self, pattern: &str) -> Result<BTreeSet<ChannelId>> {
        self.ensure_open()?;
        let names = self
            .channels
            .keys()
            .filter(|name| match pattern.strip_suffix('*') {
                Some(prefix) => name.starts_with(prefix),
                None => pattern.is_empty() || name.as_str() == pattern,
            })
            .cloned()
            .collect();
        Ok(names)
    }

    fn time_limits(&mut self, channels: &[ChannelId]) -> Result<HashMap<ChannelId, TimeLimits>> {
        self.ensure_open()?;
        if self.fail_fetches {
            return Err(TimescopeError::Fetch("simulated bounds failure".to_string()));
        }
        Ok(channels
            .iter()
            .filter(|name| self.channels.contains_key(*name))
            .map(|name| (name.clone(), self.archive))
            .collect())
    }

    fn fetch(
        &mut self,
        channels: &[ChannelId],
        start: f64,
        duration: RelativeTime,
        mode: FetchMode,
    ) -> Result<SampleBatch> {
        self.ensure_open()?;
        if self.fail_fetches {
            self.stats.record_failure();
            return Err(TimescopeError::Fetch("simulated fetch failure".to_string()));
        }

        let (start, duration) = match mode {
            FetchMode::Absolute => (start, duration),
            FetchMode::Oldest => (self.archive.earliest, duration),
            FetchMode::Newest => {
                self.archive.latest += self.advance_per_read;
                self.newest_window(duration)
            }
        };

        let batch = self.generate(channels, start, duration);
        let count: u64 = batch.values().map(|s| s.len() as u64).sum();
        self.stats.record_success(1, count);
        Ok(batch)
    }

    fn begin_stream(
        &mut self,
        channels: &[ChannelId],
        duration: RelativeTime,
        _timeout: Duration,
    ) -> Result<Option<SampleBatch>> {
        self.ensure_open()?;
        self.stream = Some(StreamState {
            channels: channels.to_vec(),
            duration,
        });

        let first_duration = if self.starve_stream {
            duration / 4.0
        } else {
            duration
        };
        let (start, _) = self.newest_window(first_duration);
        let batch = self.generate(channels, start, first_duration);
        let count: u64 = batch.values().map(|s| s.len() as u64).sum();
        self.stats.record_success(1, count);
        Ok(Some(batch))
    }

    fn read_stream(&mut self, _timeout: Duration) -> Result<Option<SampleBatch>> {
        self.ensure_open()?;
        let Some(stream) = self.stream.as_ref() else {
            return Err(TimescopeError::Stream("no active subscription".to_string()));
        };
        let (channels, duration) = (stream.channels.clone(), stream.duration);

        self.archive.latest += self.advance_per_read;
        let (start, _) = self.newest_window(duration);
        let batch = self.generate(&channels, start, duration);
        let count: u64 = batch.values().map(|s| s.len() as u64).sum();
        self.stats.record_success(1, count);
        Ok(Some(batch))
    }

    fn end_stream(&mut self) {
        self.stream = None;
    }

    fn stats(&self) -> &SourceStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut SourceStats {
        &mut self.stats
    }
}
