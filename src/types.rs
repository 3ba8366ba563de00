//! Core data types for the Timescope playback core
//!
//! This module contains the fundamental data structures shared between the
//! UI side and the playback engine.
//!
//! # Main Types
//!
//! - [`RunMode`] - Playback direction/state tag driving the engine
//! - [`TimeWindow`] - The `(start, duration)` pair currently requested
//! - [`PositionState`] - Current position plus the known data bounds
//! - [`Speed`] - Geometric playback multiplier (mantissa × 10^exponent)
//! - [`Sample`] / [`SampleBatch`] - Time-series data returned by fetches
//! - [`ControlCommand`] - Coarse, must-not-be-lost UI commands
//!
//! # Time Representation
//!
//! Absolute time is `f64` seconds since the Unix epoch; relative time
//! (durations, window lengths) is `f64` seconds. This matches the wire
//! model of the remote service and keeps window arithmetic plain.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Absolute time: seconds since the Unix epoch
pub type AbsoluteTime = f64;

/// Relative time: a span in seconds
pub type RelativeTime = f64;

/// Identifier of a data channel on the remote service
pub type ChannelId = String;

/// A single timestamped value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sample time (seconds since the Unix epoch)
    pub time: AbsoluteTime,
    /// Sample value
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(time: AbsoluteTime, value: f64) -> Self {
        Self { time, value }
    }
}

/// Per-channel samples returned by a fetch or a stream read
pub type SampleBatch = HashMap<ChannelId, Vec<Sample>>;

/// Compute the overall time extent of a batch, if it contains any samples
///
/// Samples within a channel are assumed time-ordered as delivered by the
/// service; the extent spans the earliest first sample to the latest last
/// sample across all channels.
pub fn batch_extent(batch: &SampleBatch) -> Option<TimeLimits> {
    let mut extent: Option<TimeLimits> = None;
    for samples in batch.values() {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            continue;
        };
        let limits = TimeLimits {
            earliest: first.time,
            latest: last.time,
        };
        extent = Some(match extent {
            Some(e) => e.merged(&limits),
            None => limits,
        });
    }
    extent
}

/// Playback direction/state tag driving the engine's dispatch
///
/// The engine holds the single authoritative copy; shadow copies published
/// through the run-mode mailbox exist only so the UI can reflect
/// engine-chosen state (for example after an auto-clamp to `Stop`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunMode {
    /// Jump to the beginning of the archived data, fetch once, stop
    Bof,
    /// Continuous reverse playback
    RevPlay,
    /// One discrete window step backwards
    RevStep,
    /// Idle; no data source calls
    #[default]
    Stop,
    /// One discrete window step forwards
    FwdStep,
    /// Continuous forward playback
    FwdPlay,
    /// Jump to the end of the archived data, fetch once, stop
    Eof,
    /// Follow newest data via a streaming subscription (or polling fallback)
    RealTime,
    /// Terminate the engine loop and release the connection
    Quit,
    /// One-shot fetch of the entire available range
    AllData,
    /// Re-fetch the unchanged window once, then adopt a chained mode
    Current,
}

impl RunMode {
    /// Whether this is a continuous playback mode
    pub fn is_play(&self) -> bool {
        matches!(self, RunMode::FwdPlay | RunMode::RevPlay)
    }

    /// Which window edge the user-visible position tracks in this mode
    ///
    /// Boundary, step and bulk modes anchor to the window start; real-time
    /// and EOF anchor to the window end.
    pub fn anchor(&self) -> WindowAnchor {
        match self {
            RunMode::RealTime | RunMode::Eof => WindowAnchor::End,
            _ => WindowAnchor::Start,
        }
    }
}

/// Which edge of the window stays fixed when the duration changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindowAnchor {
    /// The window start is the user-visible position
    #[default]
    Start,
    /// The window end (`start + duration`) is the user-visible position
    End,
}

/// The time range currently requested/displayed: `[start, start + duration)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start (seconds since the Unix epoch)
    pub start: AbsoluteTime,
    /// Window length in seconds; never negative
    pub duration: RelativeTime,
}

impl TimeWindow {
    /// Create a window, clamping a negative duration to zero
    pub fn new(start: AbsoluteTime, duration: RelativeTime) -> Self {
        Self {
            start,
            duration: duration.max(0.0),
        }
    }

    /// The exclusive end of the window
    pub fn end(&self) -> AbsoluteTime {
        self.start + self.duration
    }

    /// The window shifted by `delta` seconds (positive = forward)
    pub fn shifted(&self, delta: RelativeTime) -> Self {
        Self {
            start: self.start + delta,
            duration: self.duration,
        }
    }

    /// The user-visible position for the given anchor
    pub fn position(&self, anchor: WindowAnchor) -> AbsoluteTime {
        match anchor {
            WindowAnchor::Start => self.start,
            WindowAnchor::End => self.end(),
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: 60.0,
        }
    }
}

/// Current position plus the known data bounds
///
/// The engine maintains `min <= current` and `current + duration <= max`
/// after any boundary check; the invariant may be violated transiently
/// mid-computation but is always repaired before being published.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionState {
    /// Current position (window start)
    pub current: AbsoluteTime,
    /// Earliest known data time across selected channels
    pub min: AbsoluteTime,
    /// Latest known data time across selected channels
    pub max: AbsoluteTime,
}

impl PositionState {
    /// Repair the invariant for a window of the given duration
    ///
    /// Returns the clamped current position. When the known range is
    /// shorter than the window, the lower bound wins.
    pub fn repair(&mut self, duration: RelativeTime) -> AbsoluteTime {
        if self.current + duration > self.max {
            self.current = self.max - duration;
        }
        if self.current < self.min {
            self.current = self.min;
        }
        self.current
    }

    /// Expand the known bounds to cover `limits`
    pub fn expand(&mut self, limits: &TimeLimits) {
        if limits.earliest < self.min {
            self.min = limits.earliest;
        }
        if limits.latest > self.max {
            self.max = limits.latest;
        }
    }
}

/// Earliest/latest known sample times for a channel or a channel set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeLimits {
    /// Earliest sample time
    pub earliest: AbsoluteTime,
    /// Latest sample time
    pub latest: AbsoluteTime,
}

impl TimeLimits {
    /// The span between earliest and latest, in seconds
    pub fn span(&self) -> RelativeTime {
        (self.latest - self.earliest).max(0.0)
    }

    /// The union of two limit ranges
    pub fn merged(&self, other: &TimeLimits) -> TimeLimits {
        TimeLimits {
            earliest: self.earliest.min(other.earliest),
            latest: self.latest.max(other.latest),
        }
    }
}

/// Geometric playback multiplier applied to `duration` per playback tick
///
/// The factor is `mantissa × 10^exponent` with the mantissa restricted to
/// {1, 2, 5}, so repeated intensification walks the familiar
/// 1-2-5 sequence: ..., 1×10ⁿ, 2×10ⁿ, 5×10ⁿ, 1×10ⁿ⁺¹, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speed {
    /// Mantissa; one of 1, 2 or 5
    pub mantissa: u8,
    /// Decimal exponent
    pub exponent: i32,
}

impl Speed {
    /// The base speed used whenever a play mode is freshly entered
    pub fn base() -> Self {
        Self {
            mantissa: 2,
            exponent: -2,
        }
    }

    /// The multiplier value
    pub fn factor(&self) -> f64 {
        f64::from(self.mantissa) * 10f64.powi(self.exponent)
    }

    /// Advance to the next step of the 1-2-5 sequence
    pub fn intensify(&mut self) {
        match self.mantissa {
            1 => self.mantissa = 2,
            2 => self.mantissa = 5,
            _ => {
                self.mantissa = 1;
                self.exponent += 1;
            }
        }
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::base()
    }
}

/// How a fetch positions its window on the service side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fetch exactly `[start, start + duration)`
    Absolute,
    /// Fetch a window anchored at the oldest archived data
    Oldest,
    /// Fetch a window anchored at the newest archived data
    Newest,
}

/// Coarse control commands carried by the lossless command queue
///
/// Contrast with mailbox values: commands are never coalesced or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Apply a session snapshot handed over the config rendezvous slot
    LoadConfig,
    /// Produce a session snapshot into the config rendezvous slot
    SaveConfig,
    /// Open a connection to the data service at the given address
    OpenConnection(String),
    /// Re-list the channels available on the service
    RefreshChannels,
    /// Close the current connection
    CloseConnection,
    /// Switch the display to plot rendering
    SetPlotMode,
    /// Switch the display to table rendering
    SetTableMode,
    /// Re-deliver the current window so an external exporter can consume it
    Export(ExportTarget),
}

/// Destination of an export request; consumed by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// System clipboard
    Clipboard,
    /// A file chosen by the user
    File(PathBuf),
}

/// How channel data is presented; recorded by the engine, rendered elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DisplayMode {
    /// Scrolling/paged plots
    #[default]
    Plot,
    /// Tabular values
    Table,
}

/// User-requested zoom on the window duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomRequest {
    /// Halve the window duration
    In,
    /// Double the window duration
    Out,
}

/// Display format for absolute-time readouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    /// Full ISO-8601 date and time
    #[default]
    Iso8601,
    /// Time of day only
    TimeOfDay,
    /// Seconds relative to the window start
    Elapsed,
}

impl TimeFormat {
    /// Format an absolute time for display
    ///
    /// `reference` is the window start, used by the `Elapsed` format;
    /// `precision` is the number of fractional-second digits.
    pub fn format(&self, t: AbsoluteTime, reference: AbsoluteTime, precision: usize) -> String {
        use chrono::{DateTime, Utc};

        match self {
            TimeFormat::Elapsed => format!("{:+.*} s", precision, t - reference),
            _ => {
                // chrono's %.Nf only exists for N in {3, 6, 9}; the
                // fractional seconds are appended manually so any
                // precision formats without panicking.
                let precision = precision.min(9);
                let scale = 10f64.powi(precision as i32);
                let rounded = (t * scale).round() / scale;
                let secs = rounded.floor();
                let Some(dt) = DateTime::<Utc>::from_timestamp(secs as i64, 0) else {
                    return format!("{:.*}", precision, t);
                };
                let pattern = match self {
                    TimeFormat::TimeOfDay => "%H:%M:%S",
                    _ => "%Y-%m-%d %H:%M:%S",
                };
                let mut out = dt.format(pattern).to_string();
                if precision > 0 {
                    let fract = format!("{:.*}", precision, rounded - secs);
                    out.push_str(&fract[1..]);
                }
                out
            }
        }
    }
}

/// A named channel set with its own window, switchable as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayGroup {
    /// Group name shown in the UI
    pub name: String,
    /// Ordered channel set displayed by this group
    pub channels: Vec<ChannelId>,
    /// Window to restore when the group becomes active
    pub window: TimeWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps_negative_duration() {
        let w = TimeWindow::new(10.0, -5.0);
        assert_eq!(w.duration, 0.0);
        assert_eq!(w.end(), 10.0);
    }

    #[test]
    fn test_window_shift_and_position() {
        let w = TimeWindow::new(100.0, 10.0).shifted(5.0);
        assert_eq!(w.start, 105.0);
        assert_eq!(w.position(WindowAnchor::Start), 105.0);
        assert_eq!(w.position(WindowAnchor::End), 115.0);
    }

    #[test]
    fn test_speed_sequence() {
        let mut s = Speed::base();
        assert_eq!((s.mantissa, s.exponent), (2, -2));
        assert!((s.factor() - 0.02).abs() < 1e-12);

        let mut factors = Vec::new();
        for _ in 0..7 {
            s.intensify();
            factors.push(s.factor());
        }
        // 0.05, 0.1, 0.2, 0.5, 1, 2, 5
        assert!((factors[0] - 0.05).abs() < 1e-12);
        assert!((factors[3] - 0.5).abs() < 1e-12);
        assert!((factors[6] - 5.0).abs() < 1e-12);
        for pair in factors.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_position_repair() {
        let mut p = PositionState {
            current: 95.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(p.repair(10.0), 90.0);

        // Known range shorter than the window: lower bound wins.
        let mut p = PositionState {
            current: 5.0,
            min: 0.0,
            max: 4.0,
        };
        assert_eq!(p.repair(10.0), 0.0);
    }

    #[test]
    fn test_position_expand() {
        let mut p = PositionState {
            current: 5.0,
            min: 4.0,
            max: 6.0,
        };
        p.expand(&TimeLimits {
            earliest: 1.0,
            latest: 9.0,
        });
        assert_eq!(p.min, 1.0);
        assert_eq!(p.max, 9.0);
    }

    #[test]
    fn test_batch_extent() {
        let mut batch = SampleBatch::new();
        batch.insert(
            "a".to_string(),
            vec![Sample::new(1.0, 0.0), Sample::new(3.0, 0.0)],
        );
        batch.insert("b".to_string(), vec![Sample::new(2.0, 0.0)]);
        batch.insert("empty".to_string(), vec![]);

        let extent = batch_extent(&batch).unwrap();
        assert_eq!(extent.earliest, 1.0);
        assert_eq!(extent.latest, 3.0);

        assert!(batch_extent(&SampleBatch::new()).is_none());
    }

    #[test]
    fn test_run_mode_anchor() {
        assert_eq!(RunMode::RealTime.anchor(), WindowAnchor::End);
        assert_eq!(RunMode::Eof.anchor(), WindowAnchor::End);
        assert_eq!(RunMode::Bof.anchor(), WindowAnchor::Start);
        assert_eq!(RunMode::FwdPlay.anchor(), WindowAnchor::Start);
        assert_eq!(RunMode::AllData.anchor(), WindowAnchor::Start);
    }

    #[test]
    fn test_time_format_elapsed() {
        let s = TimeFormat::Elapsed.format(12.5, 10.0, 2);
        assert_eq!(s, "+2.50 s");
    }

    #[test]
    fn test_time_format_iso() {
        let s = TimeFormat::Iso8601.format(0.0, 0.0, 0);
        assert_eq!(s, "1970-01-01 00:00:00");
    }

    #[test]
    fn test_time_format_any_fractional_precision() {
        // The precision mailbox accepts any usize; every value must
        // format, not just chrono's native 3/6/9 digit widths.
        for precision in 0..=9usize {
            let s = TimeFormat::Iso8601.format(0.5, 0.0, precision);
            if precision == 0 {
                // Rounds to the nearest whole second.
                assert_eq!(s, "1970-01-01 00:00:01");
            } else {
                let frac = &s["1970-01-01 00:00:00".len()..];
                assert!(frac.starts_with('.'), "precision {precision}: {s}");
                assert_eq!(frac.len(), precision + 1, "precision {precision}: {s}");
            }
        }

        assert_eq!(TimeFormat::Iso8601.format(0.5, 0.0, 1), "1970-01-01 00:00:00.5");
        assert_eq!(TimeFormat::TimeOfDay.format(0.5, 0.0, 2), "00:00:00.50");
        // Oversized precisions are capped at nanoseconds.
        let s = TimeFormat::TimeOfDay.format(0.5, 0.0, 12);
        assert_eq!(s, "00:00:00.500000000");
    }
}
