//! Render destinations for channel data
//!
//! The playback engine does not render anything itself; it dispatches each
//! channel's samples to a per-channel [`RenderSink`] owned by the display
//! layer. Sinks are created and released through a [`SinkDirectory`] as the
//! channel selection changes.
//!
//! No error from one channel's sink may block delivery to the other
//! channels in the same data step; sink callbacks are infallible by design.

use crate::types::{ChannelId, RelativeTime, Sample};

#[cfg(test)]
use mockall::automock;

/// Per-channel display destination
#[cfg_attr(test, automock)]
pub trait RenderSink: Send {
    /// The window duration changed; rescale the time axis
    fn on_window_changed(&mut self, duration: RelativeTime);

    /// New samples for this channel, positioned at `window_start`
    fn on_channel_data(&mut self, channel: &str, samples: &[Sample], window_start: f64);

    /// The fetch covered this channel but returned no data for it
    fn on_no_data(&mut self, channel: &str);
}

/// Factory and registry for per-channel render sinks
#[cfg_attr(test, automock)]
pub trait SinkDirectory: Send {
    /// Create the render destination for a newly selected channel
    fn open_sink(&mut self, channel: &str) -> Box<dyn RenderSink>;

    /// The channel was deselected; its sink has been dropped
    fn close_sink(&mut self, channel: &str);
}

/// A sink that logs deliveries via `tracing`; used by the demo binary
#[derive(Debug, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn on_window_changed(&mut self, duration: RelativeTime) {
        tracing::debug!(duration, "window changed");
    }

    fn on_channel_data(&mut self, channel: &str, samples: &[Sample], window_start: f64) {
        tracing::info!(
            channel,
            count = samples.len(),
            window_start,
            "channel data"
        );
    }

    fn on_no_data(&mut self, channel: &str) {
        tracing::info!(channel, "no data");
    }
}

/// Directory handing out [`LogSink`]s for every channel
#[derive(Debug, Default)]
pub struct LogSinkDirectory;

impl SinkDirectory for LogSinkDirectory {
    fn open_sink(&mut self, channel: &str) -> Box<dyn RenderSink> {
        tracing::debug!(channel, "sink opened");
        Box::new(LogSink)
    }

    fn close_sink(&mut self, channel: &str) {
        tracing::debug!(channel, "sink closed");
    }
}
