//! Timescope - playback core for a time-series charting client
//!
//! Timescope is the threading and playback backbone of a desktop client for
//! browsing archived and live time-series data: a UI thread steers a
//! background engine that fetches channel data from a remote service and
//! dispatches it to per-channel render sinks.
//!
//! # Architecture
//!
//! - **Sync primitives** ([`sync`]): latest-wins mailboxes with origin
//!   tags, a lossless command queue, and a capacity-one rendezvous slot.
//!   Apart from the rendezvous, nothing here ever blocks.
//! - **Playback engine** ([`engine`]): the worker loop owning the
//!   authoritative run mode, time window and speed. Polls the mailboxes in
//!   strict priority order, then performs one data step per iteration.
//! - **Data sources** ([`source`]): the [`source::DataSource`] trait over
//!   the remote service, plus a simulated source for tests and demos.
//! - **Render sinks** ([`sink`]): per-channel display destinations the
//!   engine dispatches fetched samples to.
//!
//! # Quick Start
//!
//! ```no_run
//! use timescope::config::EngineConfig;
//! use timescope::engine::PlaybackBackend;
//! use timescope::sink::LogSinkDirectory;
//! use timescope::source::SimulatedSource;
//! use timescope::types::RunMode;
//!
//! let source = Box::new(SimulatedSource::new());
//! let (backend, ui) =
//!     PlaybackBackend::new(EngineConfig::default(), source, Box::new(LogSinkDirectory));
//! let worker = std::thread::spawn(move || backend.run());
//!
//! ui.open_connection("sim://local");
//! ui.select_channels(vec!["sine".to_string()]);
//! ui.set_run_mode(RunMode::RealTime);
//! // ... later:
//! ui.quit();
//! worker.join().unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod sink;
pub mod source;
pub mod sync;
pub mod types;

pub use engine::{PlaybackBackend, UiHandle};
pub use error::{Result, TimescopeError};
pub use types::{RunMode, Sample, SampleBatch, TimeWindow};
