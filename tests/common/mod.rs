//! Shared helpers for integration tests

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use timescope::sink::{RenderSink, SinkDirectory};
use timescope::types::Sample;

/// One observed sink callback
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    WindowChanged { channel: String, duration: f64 },
    Data { channel: String, count: usize, window_start: f64 },
    NoData { channel: String },
}

/// A sink that records every delivery into a shared log
pub struct RecordingSink {
    channel: String,
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RenderSink for RecordingSink {
    fn on_window_changed(&mut self, duration: f64) {
        self.events.lock().unwrap().push(SinkEvent::WindowChanged {
            channel: self.channel.clone(),
            duration,
        });
    }

    fn on_channel_data(&mut self, channel: &str, samples: &[Sample], window_start: f64) {
        self.events.lock().unwrap().push(SinkEvent::Data {
            channel: channel.to_string(),
            count: samples.len(),
            window_start,
        });
    }

    fn on_no_data(&mut self, channel: &str) {
        self.events.lock().unwrap().push(SinkEvent::NoData {
            channel: channel.to_string(),
        });
    }
}

/// Directory handing out [`RecordingSink`]s over one shared event log
#[derive(Default)]
pub struct RecordingDirectory {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SinkEvent>>> {
        self.events.clone()
    }

    pub fn closed(&self) -> Arc<Mutex<Vec<String>>> {
        self.closed.clone()
    }
}

impl SinkDirectory for RecordingDirectory {
    fn open_sink(&mut self, channel: &str) -> Box<dyn RenderSink> {
        Box::new(RecordingSink {
            channel: channel.to_string(),
            events: self.events.clone(),
        })
    }

    fn close_sink(&mut self, channel: &str) {
        self.closed.lock().unwrap().push(channel.to_string());
    }
}

/// Poll `check` until it yields a value or `timeout` elapses
pub fn wait_for<T>(timeout: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
