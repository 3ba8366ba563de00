//! Playback engine module
//!
//! The engine runs on its own thread, separate from the UI, and owns the
//! single authoritative [`RunMode`](crate::types::RunMode), time window and
//! playback speed. All communication with the UI passes through the
//! primitives in [`crate::sync`]:
//!
//! - [`EngineMailboxes`] - the shared mailbox/queue bundle
//! - [`PlaybackBackend`] - engine entry point that runs the worker loop
//! - [`UiHandle`] - UI-side handle wrapping the mailboxes with convenience
//!   methods
//!
//! # Example
//!
//! ```ignore
//! use timescope::config::EngineConfig;
//! use timescope::engine::PlaybackBackend;
//! use timescope::sink::LogSinkDirectory;
//! use timescope::source::SimulatedSource;
//! use timescope::types::RunMode;
//!
//! let config = EngineConfig::default();
//! let source = Box::new(SimulatedSource::new());
//! let (backend, ui) = PlaybackBackend::new(config, source, Box::new(LogSinkDirectory));
//!
//! let handle = std::thread::spawn(move || backend.run());
//!
//! ui.open_connection("sim://local");
//! ui.select_channels(vec!["sine".to_string()]);
//! ui.set_run_mode(RunMode::AllData);
//! // ...
//! ui.quit();
//! handle.join().unwrap();
//! ```

pub mod playback;

pub use playback::PlaybackEngine;

use crate::config::{EngineConfig, SessionSnapshot};
use crate::sink::SinkDirectory;
use crate::source::{DataSource, SourceStats};
use crate::sync::{CommandQueue, PositionDurationStore, RendezvousSlot, Side, ValueMailbox};
use crate::types::{
    AbsoluteTime, ChannelId, ControlCommand, DisplayGroup, DisplayMode, RelativeTime, RunMode,
    TimeFormat, ZoomRequest,
};
use std::sync::Arc;

/// Engine-to-UI payload of the config round trip
///
/// `SaveConfig`: the engine answers with a `Snapshot`. `LoadConfig`: the
/// UI hands its snapshot over the request slot and the engine answers
/// `Applied`. The two slots are strictly directional (requests flow UI to
/// engine, replies engine to UI), so neither side can consume a value it
/// put itself. This round trip is the only place either thread blocks
/// indefinitely.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigExchange {
    /// The engine's snapshot, answering `SaveConfig`
    Snapshot(SessionSnapshot),
    /// Engine acknowledgement that a snapshot has been applied
    Applied,
}

/// The mailbox/queue bundle shared between the UI thread and the engine
///
/// Every mailbox has exactly one writer side and one reader side per
/// direction; the origin tag enforces that a side never observes its own
/// writes.
#[derive(Debug)]
pub struct EngineMailboxes {
    /// Requested/reflected run mode
    pub run_mode: ValueMailbox<RunMode>,
    /// Ordered channel selection; engine-priority (a pending engine write
    /// wins a race against a not-yet-read UI write)
    pub selection: ValueMailbox<Vec<ChannelId>>,
    /// Display-group switch request; engine-priority like the selection
    pub group: ValueMailbox<Option<DisplayGroup>>,
    /// Lossless control command queue
    pub commands: CommandQueue<ControlCommand>,
    /// Position/duration/readout mailbox bundle
    pub position: PositionDurationStore,
    /// Config round trip, UI-to-engine direction: the snapshot to apply
    pub config_requests: RendezvousSlot<SessionSnapshot>,
    /// Config round trip, engine-to-UI direction: snapshot or acknowledgement
    pub config_replies: RendezvousSlot<ConfigExchange>,
    /// Connection status readout (engine to UI)
    pub connected: ValueMailbox<bool>,
    /// Channel registry readout, filled by `RefreshChannels`
    pub channel_list: ValueMailbox<Vec<ChannelId>>,
    /// Display mode readout (engine to UI)
    pub display_mode: ValueMailbox<DisplayMode>,
    /// Fetch statistics readout, refreshed after every dispatch
    pub source_stats: ValueMailbox<SourceStats>,
}

impl EngineMailboxes {
    /// Create the bundle with the configured default duration
    pub fn new(default_duration: RelativeTime) -> Self {
        Self {
            run_mode: ValueMailbox::new(RunMode::Stop),
            selection: ValueMailbox::with_engine_priority(Vec::new()),
            group: ValueMailbox::with_engine_priority(None),
            commands: CommandQueue::new(),
            position: PositionDurationStore::new(default_duration),
            config_requests: RendezvousSlot::new(),
            config_replies: RendezvousSlot::new(),
            connected: ValueMailbox::new(false),
            channel_list: ValueMailbox::new(Vec::new()),
            display_mode: ValueMailbox::new(DisplayMode::default()),
            source_stats: ValueMailbox::new(SourceStats::default()),
        }
    }
}

/// Engine entry point: owns the data source and the sink directory
pub struct PlaybackBackend {
    config: EngineConfig,
    mailboxes: Arc<EngineMailboxes>,
    source: Box<dyn DataSource>,
    sinks: Box<dyn SinkDirectory>,
}

impl PlaybackBackend {
    /// Create a backend and the UI handle wired to it
    pub fn new(
        config: EngineConfig,
        source: Box<dyn DataSource>,
        sinks: Box<dyn SinkDirectory>,
    ) -> (Self, UiHandle) {
        let mailboxes = Arc::new(EngineMailboxes::new(config.default_duration_secs));
        let backend = Self {
            config,
            mailboxes: mailboxes.clone(),
            source,
            sinks,
        };
        (backend, UiHandle { mailboxes })
    }

    /// Run the engine loop on the current thread until `Quit`
    pub fn run(self) {
        let mut engine =
            PlaybackEngine::new(self.config, self.mailboxes, self.source, self.sinks);
        engine.run();
    }
}

/// UI-side handle over the shared mailboxes
///
/// All writes carry `Side::Ui`; readout accessors consume engine-origin
/// updates. The handle is cheap to clone and safe to keep on the UI thread
/// for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct UiHandle {
    mailboxes: Arc<EngineMailboxes>,
}

impl UiHandle {
    /// Request a run-mode change
    pub fn set_run_mode(&self, mode: RunMode) {
        self.mailboxes.run_mode.set(mode, Side::Ui);
    }

    /// Replace the displayed channel selection
    pub fn select_channels(&self, channels: Vec<ChannelId>) {
        self.mailboxes.selection.set(channels, Side::Ui);
    }

    /// Switch to a display group (channel set + window)
    pub fn switch_group(&self, group: DisplayGroup) {
        self.mailboxes.group.set(Some(group), Side::Ui);
    }

    /// Enqueue a control command; never coalesced or dropped
    pub fn send_command(&self, cmd: ControlCommand) {
        self.mailboxes.commands.push(cmd);
    }

    /// Request a connection to the data service
    pub fn open_connection(&self, address: impl Into<String>) {
        self.send_command(ControlCommand::OpenConnection(address.into()));
    }

    /// Request disconnection
    pub fn close_connection(&self) {
        self.send_command(ControlCommand::CloseConnection);
    }

    /// Request a channel-list refresh
    pub fn refresh_channels(&self) {
        self.send_command(ControlCommand::RefreshChannels);
    }

    /// Move the visible position (the anchored window edge)
    pub fn set_position(&self, position: AbsoluteTime) {
        self.mailboxes.position.position.set(position, Side::Ui);
    }

    /// Change the window duration
    pub fn set_duration(&self, duration: RelativeTime) {
        self.mailboxes.position.duration.set(duration, Side::Ui);
    }

    /// Request a zoom step on the window duration
    pub fn request_zoom(&self, zoom: ZoomRequest) {
        self.mailboxes.position.zoom.set(Some(zoom), Side::Ui);
    }

    /// Set the time readout format
    pub fn set_time_format(&self, format: TimeFormat) {
        self.mailboxes.position.time_format.set(format, Side::Ui);
    }

    /// Set the fractional-second precision of readouts
    pub fn set_precision(&self, precision: usize) {
        self.mailboxes.position.precision.set(precision, Side::Ui);
    }

    /// Consume the engine's run-mode shadow, if a new one is pending
    pub fn run_mode(&self) -> Option<RunMode> {
        self.mailboxes.run_mode.get(Side::Ui)
    }

    /// Consume a connection status update, if pending
    pub fn connection_status(&self) -> Option<bool> {
        self.mailboxes.connected.get(Side::Ui)
    }

    /// Consume a refreshed channel list, if pending
    pub fn channel_list(&self) -> Option<Vec<ChannelId>> {
        self.mailboxes.channel_list.get(Side::Ui)
    }

    /// Consume a display-mode update, if pending
    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.mailboxes.display_mode.get(Side::Ui)
    }

    /// Consume a position readout, if pending
    pub fn position_readout(&self) -> Option<AbsoluteTime> {
        self.mailboxes.position.position.get(Side::Ui)
    }

    /// Consume an update-rate readout, if pending
    pub fn update_rate(&self) -> Option<String> {
        self.mailboxes.position.update_rate.get(Side::Ui)
    }

    /// Consume a fetch-statistics readout, if pending
    pub fn source_stats(&self) -> Option<SourceStats> {
        self.mailboxes.source_stats.get(Side::Ui)
    }

    /// Direct access to the shared mailboxes, for UI code with bespoke needs
    pub fn mailboxes(&self) -> &EngineMailboxes {
        &self.mailboxes
    }

    /// Save-config round trip: blocks until the engine answers
    ///
    /// Pushes `SaveConfig` and waits at the reply slot for the engine's
    /// snapshot. Bounded by the engine's responsiveness, not by a timeout.
    pub fn save_session(&self) -> SessionSnapshot {
        self.send_command(ControlCommand::SaveConfig);
        loop {
            match self.mailboxes.config_replies.take() {
                ConfigExchange::Snapshot(snapshot) => return snapshot,
                ConfigExchange::Applied => {
                    tracing::warn!("unexpected acknowledgement while waiting for snapshot");
                }
            }
        }
    }

    /// Load-config round trip: blocks until the engine has applied it
    ///
    /// The snapshot travels over the UI-to-engine request slot and the
    /// acknowledgement comes back over the reply slot, so the UI cannot
    /// steal its own request back while the engine is still on its way.
    pub fn load_session(&self, snapshot: SessionSnapshot) {
        self.send_command(ControlCommand::LoadConfig);
        self.mailboxes.config_requests.put(snapshot);
        loop {
            match self.mailboxes.config_replies.take() {
                ConfigExchange::Applied => return,
                ConfigExchange::Snapshot(_) => {
                    tracing::warn!("stray snapshot reply while waiting for acknowledgement");
                }
            }
        }
    }

    /// Request engine termination; the sole cancellation path
    pub fn quit(&self) {
        self.set_run_mode(RunMode::Quit);
    }
}
