//! Playback engine worker loop
//!
//! This module contains the engine loop that runs on the background thread
//! and decides what data to request, when, and how. It communicates with
//! the UI thread exclusively through the mailbox bundle.
//!
//! # Loop Structure
//!
//! Each iteration polls the mailboxes/queue in strict priority order until
//! one yields work; when none does, it performs exactly one data step for
//! the current run mode:
//!
//! 1. channel-selection mailbox - reconcile render destinations
//! 2. display-group mailbox - swap the active channel set and window
//! 3. command queue - execute one control command
//! 4. duration mailbox (and zoom requests) - rewindow per anchor
//! 5. position mailbox - adopt a UI-supplied position
//! 6. run-mode mailbox - adopt a new mode, reset or advance the speed
//! 7. otherwise: one data step for the current run mode
//!
//! A short yield sleep separates iterations; the real-time path adds a
//! bounded idle backoff while no new data arrives.
//!
//! # Failure Policy
//!
//! A failed fetch or bounds query halts playback by forcing `Stop`; a new
//! user command is required to resume. A starved streaming subscription is
//! not an error: the engine degrades to discrete "fetch newest" polling
//! for the rest of the session, until the user re-selects real-time mode.
//! Per-channel missing data only reaches that channel's sink.

use crate::config::{EngineConfig, SessionSnapshot};
use crate::engine::{ConfigExchange, EngineMailboxes};
use crate::error::ResultExt;
use crate::sink::{RenderSink, SinkDirectory};
use crate::source::DataSource;
use crate::sync::Side;
use crate::types::{
    batch_extent, AbsoluteTime, ChannelId, ControlCommand, DisplayGroup, DisplayMode, PositionState,
    RelativeTime, RunMode, SampleBatch, Speed, TimeLimits, TimeWindow, WindowAnchor, ZoomRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The background worker that owns the authoritative playback state
pub struct PlaybackEngine {
    /// Engine configuration
    config: EngineConfig,
    /// Shared mailbox bundle
    mailboxes: Arc<EngineMailboxes>,
    /// Remote data service
    source: Box<dyn DataSource>,
    /// Factory for per-channel render destinations
    directory: Box<dyn SinkDirectory>,
    /// Active render destinations, one per selected channel
    sinks: HashMap<ChannelId, Box<dyn RenderSink>>,
    /// Ordered channel selection
    selected: Vec<ChannelId>,
    /// The single authoritative run mode
    mode: RunMode,
    /// The single authoritative time window
    window: TimeWindow,
    /// Playback speed multiplier
    speed: Speed,
    /// Known data bounds and current position
    bounds: PositionState,
    /// Whether `bounds` reflects a successful bounds query
    bounds_known: bool,
    /// Plot/table presentation, recorded for the UI
    display_mode: DisplayMode,
    /// Whether a streaming subscription is active
    stream_active: bool,
    /// Sticky: streaming failed this session, poll instead (cleared only
    /// when the user re-selects real-time mode)
    stream_fallback: bool,
    /// Real-time idle backoff, bounded by the configured range
    idle_wait: Duration,
    /// Extent of the last real-time batch, for no-new-data detection
    last_rt_extent: Option<TimeLimits>,
    /// Exponentially smoothed update rate for the readout (Hz)
    rate_hz: f64,
    /// Time of the last dispatch, for the rate estimate
    last_dispatch: Option<Instant>,
}

impl PlaybackEngine {
    /// Create an engine; idle in `Stop` until the UI says otherwise
    pub fn new(
        config: EngineConfig,
        mailboxes: Arc<EngineMailboxes>,
        source: Box<dyn DataSource>,
        directory: Box<dyn SinkDirectory>,
    ) -> Self {
        let window = TimeWindow::new(0.0, config.default_duration_secs);
        let idle_wait = config.idle_wait_bounds().0;
        Self {
            config,
            mailboxes,
            source,
            directory,
            sinks: HashMap::new(),
            selected: Vec::new(),
            mode: RunMode::Stop,
            window,
            speed: Speed::base(),
            bounds: PositionState::default(),
            bounds_known: false,
            display_mode: DisplayMode::default(),
            stream_active: false,
            stream_fallback: false,
            idle_wait,
            last_rt_extent: None,
            rate_hz: 0.0,
            last_dispatch: None,
        }
    }

    /// Run the engine loop until `Quit`, then release the connection
    pub fn run(&mut self) {
        tracing::info!("playback engine started");

        loop {
            let handled = self.poll_control();
            if self.mode == RunMode::Quit {
                break;
            }
            if !handled {
                self.data_step();
                if self.mode == RunMode::Quit {
                    break;
                }
            }
            std::thread::sleep(self.config.poll_interval());
        }

        self.shutdown();
        tracing::info!("playback engine stopped");
    }

    /// Poll the mailboxes/queue in priority order; true if one yielded work
    fn poll_control(&mut self) -> bool {
        if let Some(selection) = self.mailboxes.selection.get(Side::Engine) {
            self.reconcile_selection(selection);
            return true;
        }
        if let Some(Some(group)) = self.mailboxes.group.get(Side::Engine) {
            self.switch_group(group);
            return true;
        }
        if let Some(cmd) = self.mailboxes.commands.pop() {
            self.handle_command(cmd);
            return true;
        }
        if let Some(duration) = self.mailboxes.position.duration.get(Side::Engine) {
            self.change_duration(duration);
            return true;
        }
        if let Some(Some(zoom)) = self.mailboxes.position.zoom.get(Side::Engine) {
            self.apply_zoom(zoom);
            return true;
        }
        if let Some(position) = self.mailboxes.position.position.get(Side::Engine) {
            self.adopt_position(position);
            return true;
        }
        if let Some(mode) = self.mailboxes.run_mode.get(Side::Engine) {
            self.adopt_mode(mode);
            return true;
        }
        false
    }

    /// One data step for the current run mode
    fn data_step(&mut self) {
        match self.mode {
            RunMode::Stop | RunMode::Quit => {}
            RunMode::Bof => {
                if self.refresh_bounds() {
                    self.window.start = self.bounds.min;
                    self.fetch_window();
                }
                self.set_mode(RunMode::Stop);
            }
            RunMode::Eof => {
                if self.refresh_bounds() {
                    self.window.start = self.bounds.max - self.window.duration;
                    self.fetch_window();
                }
                self.set_mode(RunMode::Stop);
            }
            RunMode::AllData => {
                if self.refresh_bounds() {
                    let duration = (self.bounds.max - self.bounds.min).max(0.0);
                    self.window = TimeWindow::new(self.bounds.min, duration);
                    for sink in self.sinks.values_mut() {
                        sink.on_window_changed(duration);
                    }
                    self.mailboxes.position.duration.set(duration, Side::Engine);
                    self.fetch_window();
                }
                self.set_mode(RunMode::Stop);
            }
            RunMode::FwdStep => self.step(1.0),
            RunMode::RevStep => self.step(-1.0),
            RunMode::FwdPlay => self.play(1.0),
            RunMode::RevPlay => self.play(-1.0),
            RunMode::RealTime => self.real_time_step(),
            RunMode::Current => {
                self.fetch_window();
                // Chained mode: "do one fetch, then continue as directed".
                match self.mailboxes.run_mode.get(Side::Engine) {
                    Some(next) => self.adopt_mode(next),
                    None => self.set_mode(RunMode::Stop),
                }
            }
        }
    }

    // ==================== Control handling ====================

    /// Replace the channel selection, opening/closing sinks as needed
    fn reconcile_selection(&mut self, selection: Vec<ChannelId>) {
        let mut unique: Vec<ChannelId> = Vec::with_capacity(selection.len());
        for name in selection {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }

        let removed: Vec<ChannelId> = self
            .selected
            .iter()
            .filter(|name| !unique.contains(name))
            .cloned()
            .collect();
        for name in removed {
            self.sinks.remove(&name);
            self.directory.close_sink(&name);
        }

        for name in &unique {
            if !self.sinks.contains_key(name) {
                let mut sink = self.directory.open_sink(name);
                sink.on_window_changed(self.window.duration);
                self.sinks.insert(name.clone(), sink);
            }
        }

        tracing::debug!(channels = unique.len(), "selection reconciled");
        self.selected = unique;
        self.bounds_known = false;
    }

    /// Swap the active channel set and window for a display group
    fn switch_group(&mut self, group: DisplayGroup) {
        tracing::info!(group = %group.name, "switching display group");
        self.window = group.window;
        self.reconcile_selection(group.channels.clone());
        for sink in self.sinks.values_mut() {
            sink.on_window_changed(self.window.duration);
        }
        // Engine-originated shadow of the new selection. A not-yet-read
        // stray UI click loses the race against this write by design.
        self.mailboxes.selection.set(group.channels, Side::Engine);
        self.mailboxes
            .position
            .duration
            .set(self.window.duration, Side::Engine);
        self.publish_readout();
        if !self.mode.is_play() && self.mode != RunMode::RealTime {
            self.set_mode(RunMode::Current);
        }
    }

    /// Execute one control command from the lossless queue
    fn handle_command(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::OpenConnection(address) => {
                let status = match self.source.open(&address) {
                    Ok(ok) => ok,
                    Err(e) => {
                        tracing::error!("Failed to connect to {}: {}", address, e);
                        false
                    }
                };
                if status {
                    tracing::info!("Connected to data service at {}", address);
                    self.bounds_known = false;
                } else {
                    tracing::warn!("Data service at {} refused connection", address);
                }
                // No automatic retry; the engine stays idle either way.
                self.mailboxes.connected.set(status, Side::Engine);
            }
            ControlCommand::CloseConnection => {
                if self.stream_active {
                    self.source.end_stream();
                    self.stream_active = false;
                }
                self.source.close();
                self.bounds_known = false;
                self.mailboxes.connected.set(false, Side::Engine);
                self.set_mode(RunMode::Stop);
                tracing::info!("Disconnected from data service");
            }
            ControlCommand::RefreshChannels => match self.source.list_channels("*") {
                Ok(channels) => {
                    let list: Vec<ChannelId> = channels.into_iter().collect();
                    tracing::debug!(count = list.len(), "channel list refreshed");
                    self.mailboxes.channel_list.set(list, Side::Engine);
                }
                Err(e) => tracing::error!("Channel list refresh failed: {}", e),
            },
            ControlCommand::SaveConfig => {
                let snapshot = self.snapshot();
                self.mailboxes
                    .config_replies
                    .put(ConfigExchange::Snapshot(snapshot));
            }
            ControlCommand::LoadConfig => {
                // Blocks until the UI's snapshot arrives on the request
                // slot; the acknowledgement goes back on the reply slot.
                let snapshot = self.mailboxes.config_requests.take();
                self.apply_snapshot(snapshot);
                self.mailboxes.config_replies.put(ConfigExchange::Applied);
            }
            ControlCommand::SetPlotMode => {
                self.display_mode = DisplayMode::Plot;
                self.mailboxes.display_mode.set(DisplayMode::Plot, Side::Engine);
            }
            ControlCommand::SetTableMode => {
                self.display_mode = DisplayMode::Table;
                self.mailboxes
                    .display_mode
                    .set(DisplayMode::Table, Side::Engine);
            }
            ControlCommand::Export(target) => {
                // Re-deliver the current window; the external export sink
                // consumes it from its RenderSink like any other delivery.
                tracing::info!(?target, "export requested");
                if !self.selected.is_empty() {
                    self.set_mode(RunMode::Current);
                }
            }
        }
    }

    /// Absorb a duration change, keeping the anchored edge stationary
    fn change_duration(&mut self, duration: RelativeTime) {
        let duration = duration.max(0.0);
        self.window = self.mailboxes.position.rewindow(self.window, duration);
        for sink in self.sinks.values_mut() {
            sink.on_window_changed(duration);
        }
        self.publish_readout();
    }

    /// Apply a zoom request as a duration change
    fn apply_zoom(&mut self, zoom: ZoomRequest) {
        let factor = match zoom {
            ZoomRequest::In => 0.5,
            ZoomRequest::Out => 2.0,
        };
        let duration = self.window.duration * factor;
        self.change_duration(duration);
        self.mailboxes.position.duration.set(duration, Side::Engine);
    }

    /// Adopt a UI-supplied position
    ///
    /// Adopted verbatim when within the known bounds; otherwise the bounds
    /// are refreshed first and the position clamped into them.
    fn adopt_position(&mut self, position: AbsoluteTime) {
        let mut start = match self.mailboxes.position.anchor() {
            WindowAnchor::Start => position,
            WindowAnchor::End => position - self.window.duration,
        };

        let within = self.bounds_known
            && start >= self.bounds.min
            && start + self.window.duration <= self.bounds.max;
        if !within {
            if !self.refresh_bounds() {
                return;
            }
            self.bounds.current = start;
            start = self.bounds.repair(self.window.duration);
        }

        self.window.start = start;
        self.publish_readout();
        if self.mode == RunMode::Stop {
            self.set_mode(RunMode::Current);
        }
    }

    /// Adopt a UI-requested run mode; reset or advance the speed
    fn adopt_mode(&mut self, mode: RunMode) {
        if mode.is_play() {
            if self.mode == mode {
                self.speed.intensify();
                tracing::debug!(factor = self.speed.factor(), "play speed intensified");
            } else {
                self.speed = Speed::base();
            }
        }
        if mode == RunMode::RealTime {
            // Re-selecting real-time is the only thing that clears the
            // streaming fallback for the session.
            self.stream_fallback = false;
            self.last_rt_extent = None;
            self.idle_wait = self.config.idle_wait_bounds().0;
        }
        if self.stream_active && mode != RunMode::RealTime {
            self.source.end_stream();
            self.stream_active = false;
        }
        self.mode = mode;
        self.mailboxes.position.set_anchor(mode.anchor());
    }

    /// Engine-chosen mode transition; publishes a shadow for the UI
    fn set_mode(&mut self, mode: RunMode) {
        if self.stream_active && mode != RunMode::RealTime {
            self.source.end_stream();
            self.stream_active = false;
        }
        self.mode = mode;
        self.mailboxes.run_mode.set(mode, Side::Engine);
    }

    // ==================== Data steps ====================

    /// Shift by exactly one duration, fetch once, stop
    fn step(&mut self, direction: f64) {
        let delta = self.window.duration * direction;
        self.window = self.window.shifted(delta);
        if !self.bounds_known {
            self.refresh_bounds();
        }
        if self.bounds_known {
            self.bounds.current = self.window.start;
            self.window.start = self.bounds.repair(self.window.duration);
        }
        self.fetch_window();
        // A true single discrete step: stop regardless of outcome.
        self.set_mode(RunMode::Stop);
    }

    /// One continuous playback iteration
    fn play(&mut self, direction: f64) {
        if self.selected.is_empty() {
            return;
        }
        let delta = self.window.duration * self.speed.factor() * direction;
        let mut shifted = self.window.shifted(delta);

        if !self.bounds_known || self.out_of_bounds(&shifted) {
            if !self.refresh_bounds() {
                return;
            }
        }

        if self.out_of_bounds(&shifted) {
            self.bounds.current = shifted.start;
            shifted.start = self.bounds.repair(shifted.duration);
            self.window = shifted;
            self.fetch_window();
            tracing::debug!("playback reached data boundary; stopping");
            self.set_mode(RunMode::Stop);
        } else {
            self.window = shifted;
            self.fetch_window();
        }
    }

    fn out_of_bounds(&self, window: &TimeWindow) -> bool {
        window.start < self.bounds.min || window.end() > self.bounds.max
    }

    /// One real-time iteration: streaming subscription or polling fallback
    fn real_time_step(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let timeout = self.config.stream_timeout(self.window.duration);

        if !self.stream_active && !self.stream_fallback {
            match self
                .source
                .begin_stream(&self.selected, self.window.duration, timeout)
            {
                Ok(Some(first)) => {
                    let sufficient = batch_extent(&first)
                        .map(|e| e.span() + 1e-9 >= self.window.duration)
                        .unwrap_or(false);
                    if sufficient {
                        self.stream_active = true;
                        self.apply_rt_batch(&first);
                    } else {
                        tracing::warn!(
                            "stream opened with less than a full window; \
                             falling back to polling for this session"
                        );
                        self.source.end_stream();
                        self.stream_fallback = true;
                    }
                }
                Ok(None) => {
                    tracing::warn!("stream produced no data; falling back to polling");
                    self.source.end_stream();
                    self.stream_fallback = true;
                }
                Err(e) => {
                    // Degrades, does not halt: timeouts are local to the
                    // streaming path.
                    tracing::warn!("stream failed to open ({}); falling back to polling", e);
                    self.source.end_stream();
                    self.stream_fallback = true;
                }
            }
        } else {
            let result = if self.stream_active {
                self.source.read_stream(timeout)
            } else {
                self.source
                    .fetch(&self.selected, 0.0, self.window.duration, crate::types::FetchMode::Newest)
                    .map(Some)
            };
            match result {
                Ok(Some(batch)) => self.apply_rt_batch(&batch),
                Ok(None) => self.rt_idle(),
                Err(e) => {
                    if self.stream_active {
                        tracing::warn!("stream read failed ({}); falling back to polling", e);
                        self.source.end_stream();
                        self.stream_active = false;
                        self.stream_fallback = true;
                    } else {
                        tracing::error!("real-time fetch failed: {}", e);
                        self.set_mode(RunMode::Stop);
                    }
                }
            }
        }

        if let Some(extra) = self.config.extra_step_delay() {
            std::thread::sleep(extra);
        }
    }

    /// Render a real-time batch, or back off when nothing advanced
    fn apply_rt_batch(&mut self, batch: &SampleBatch) {
        let Some(extent) = batch_extent(batch) else {
            self.rt_idle();
            return;
        };
        if self.last_rt_extent == Some(extent) {
            // No new data: widen the idle wait and skip rendering.
            self.rt_idle();
            return;
        }
        let (min_wait, _) = self.config.idle_wait_bounds();
        self.idle_wait = (self.idle_wait / 2).max(min_wait);
        self.last_rt_extent = Some(extent);
        self.window.start = extent.latest - self.window.duration;
        self.dispatch(batch);
    }

    /// Sleep the current idle wait, then double it within bounds
    fn rt_idle(&mut self) {
        let (_, max_wait) = self.config.idle_wait_bounds();
        std::thread::sleep(self.idle_wait);
        self.idle_wait = (self.idle_wait * 2).min(max_wait);
    }

    // ==================== Fetching & dispatch ====================

    /// Re-query the earliest/latest known sample times for the selection
    fn refresh_bounds(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        match self
            .source
            .time_limits(&self.selected)
            .context("querying data bounds")
        {
            Ok(limits) => {
                let merged = limits
                    .values()
                    .copied()
                    .reduce(|a, b| a.merged(&b));
                match merged {
                    Some(limits) => {
                        self.bounds.min = limits.earliest;
                        self.bounds.max = limits.latest;
                        self.bounds_known = true;
                        true
                    }
                    None => {
                        tracing::debug!("no bounds known for current selection");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!("bounds query failed: {}", e);
                self.set_mode(RunMode::Stop);
                false
            }
        }
    }

    /// Fetch the current window; halts playback on failure
    fn fetch_window(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        let start = self.window.start;
        match self
            .source
            .fetch(
                &self.selected,
                start,
                self.window.duration,
                crate::types::FetchMode::Absolute,
            )
            .with_context(|| format!("fetching window at {start:.3}"))
        {
            Ok(batch) => {
                self.dispatch(&batch);
                true
            }
            Err(e) => {
                // Fail-safe halt; a new user command is required to resume.
                tracing::error!("fetch failed: {}", e);
                self.set_mode(RunMode::Stop);
                false
            }
        }
    }

    /// Deliver a batch to the sinks and publish the readouts
    fn dispatch(&mut self, batch: &SampleBatch) {
        if let Some(extent) = batch_extent(batch) {
            if self.bounds_known {
                self.bounds.expand(&extent);
            } else {
                self.bounds.min = extent.earliest;
                self.bounds.max = extent.latest;
                self.bounds_known = true;
            }
        }

        for name in &self.selected {
            let Some(sink) = self.sinks.get_mut(name) else {
                continue;
            };
            match batch.get(name) {
                Some(samples) if !samples.is_empty() => {
                    sink.on_channel_data(name, samples, self.window.start);
                }
                _ => sink.on_no_data(name),
            }
        }

        self.update_rate_estimate();
        self.mailboxes
            .source_stats
            .set(self.source.stats().clone(), Side::Engine);
        self.publish_readout();
    }

    /// Exponentially smoothed update-rate readout
    fn update_rate_estimate(&mut self) {
        let now = Instant::now();
        if let Some(previous) = self.last_dispatch {
            let dt = now.duration_since(previous).as_secs_f64();
            if dt > 0.0 {
                let instantaneous = 1.0 / dt;
                let alpha = self.config.rate_smoothing.clamp(0.0, 1.0);
                self.rate_hz = if self.rate_hz == 0.0 {
                    instantaneous
                } else {
                    alpha * instantaneous + (1.0 - alpha) * self.rate_hz
                };
                self.mailboxes
                    .position
                    .update_rate
                    .set(format!("{:.1} updates/s", self.rate_hz), Side::Engine);
            }
        }
        self.last_dispatch = Some(now);
    }

    /// Publish position and bounds readouts for the UI
    fn publish_readout(&self) {
        self.mailboxes
            .position
            .publish(self.window, self.bounds.min, self.bounds.max);
    }

    /// The engine's user-steerable state as a snapshot
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channels: self.selected.clone(),
            window: self.window,
            anchor: self.mailboxes.position.anchor(),
            time_format: self.mailboxes.position.time_format.peek(),
            precision: self.mailboxes.position.precision.peek(),
            display_mode: self.display_mode,
        }
    }

    /// Restore a snapshot and refresh the display
    fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.mailboxes.position.set_anchor(snapshot.anchor);
        self.window = snapshot.window;
        self.reconcile_selection(snapshot.channels.clone());
        self.mailboxes.selection.set(snapshot.channels, Side::Engine);
        self.mailboxes
            .position
            .duration
            .set(snapshot.window.duration, Side::Engine);
        self.mailboxes
            .position
            .time_format
            .set(snapshot.time_format, Side::Engine);
        self.mailboxes
            .position
            .precision
            .set(snapshot.precision, Side::Engine);
        self.display_mode = snapshot.display_mode;
        self.mailboxes
            .display_mode
            .set(snapshot.display_mode, Side::Engine);
        self.publish_readout();
        self.set_mode(RunMode::Current);
    }

    /// Release the streaming subscription and the connection
    fn shutdown(&mut self) {
        if self.stream_active {
            self.source.end_stream();
            self.stream_active = false;
        }
        self.source.close();
        self.mailboxes.connected.set(false, Side::Engine);
    }
}
