//! End-to-end tests driving the engine over a real worker thread
//!
//! These exercise the full UI-handle / mailbox / engine-loop path with the
//! simulated source, including the blocking config rendezvous.

mod common;

use common::{wait_for, RecordingDirectory, SinkEvent};
use std::time::Duration;
use timescope::config::EngineConfig;
use timescope::engine::PlaybackBackend;
use timescope::source::{SimulatedSource, WavePattern};
use timescope::sync::Side;
use timescope::types::{RunMode, TimeWindow};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 1,
        idle_wait_min_ms: 1,
        idle_wait_max_ms: 8,
        ..EngineConfig::default()
    }
}

fn archive_source() -> SimulatedSource {
    SimulatedSource::new()
        .with_archive(1000.0, 2000.0)
        .with_sample_period(1.0)
        .with_channel("sine", WavePattern::default())
        .with_channel("ramp", WavePattern::Ramp { slope: 1.0, offset: 0.0 })
}

#[test]
fn test_connect_select_and_all_data() {
    let directory = RecordingDirectory::new();
    let events = directory.events();
    let (backend, ui) = PlaybackBackend::new(
        fast_config(),
        Box::new(archive_source()),
        Box::new(directory),
    );
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    assert_eq!(
        wait_for(TIMEOUT, || ui.connection_status()),
        Some(true)
    );

    ui.refresh_channels();
    let channels = wait_for(TIMEOUT, || ui.channel_list()).unwrap();
    assert_eq!(channels, vec!["ramp".to_string(), "sine".to_string()]);

    ui.select_channels(channels);
    ui.set_run_mode(RunMode::AllData);

    // AllData is one-shot: the engine fetches the full range and reports
    // the transition back to Stop.
    let stopped = wait_for(TIMEOUT, || {
        ui.run_mode().filter(|m| *m == RunMode::Stop)
    });
    assert_eq!(stopped, Some(RunMode::Stop));

    let recorded = events.lock().unwrap().clone();
    for name in ["ramp", "sine"] {
        assert!(
            recorded
                .iter()
                .any(|e| matches!(e, SinkEvent::Data { channel, count, .. }
                    if channel == name && *count > 0)),
            "no data delivered for {name}: {recorded:?}"
        );
    }

    ui.quit();
    worker.join().unwrap();
}

#[test]
fn test_realtime_follows_live_data() {
    let mut source = archive_source();
    source.advance_per_read = 2.0;
    let directory = RecordingDirectory::new();
    let events = directory.events();
    let (backend, ui) =
        PlaybackBackend::new(fast_config(), Box::new(source), Box::new(directory));
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    ui.select_channels(vec!["ramp".to_string()]);
    ui.set_run_mode(RunMode::RealTime);

    let starts = wait_for(TIMEOUT, || {
        let starts: Vec<f64> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Data { window_start, .. } => Some(*window_start),
                _ => None,
            })
            .collect();
        (starts.len() >= 3).then_some(starts)
    })
    .expect("expected at least three real-time deliveries");

    // The window follows the newest data monotonically.
    for pair in starts.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert!(starts.last().unwrap() > starts.first().unwrap());

    ui.quit();
    worker.join().unwrap();
}

#[test]
fn test_save_and_load_session_round_trip() {
    let (backend, ui) = PlaybackBackend::new(
        fast_config(),
        Box::new(archive_source()),
        Box::new(RecordingDirectory::new()),
    );
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    ui.select_channels(vec!["sine".to_string()]);
    assert_eq!(wait_for(TIMEOUT, || ui.connection_status()), Some(true));

    // Blocking rendezvous: the UI thread waits for the engine's snapshot.
    let mut snapshot = ui.save_session();
    assert_eq!(snapshot.channels, vec!["sine".to_string()]);

    snapshot.window = TimeWindow::new(1500.0, 5.0);
    ui.load_session(snapshot);

    // The engine shadows the restored duration back to the UI.
    let duration = wait_for(TIMEOUT, || {
        ui.mailboxes().position.duration.get(Side::Ui)
    });
    assert_eq!(duration, Some(5.0));

    ui.quit();
    worker.join().unwrap();
}

#[test]
fn test_fetch_failure_halts_engine() {
    let mut source = archive_source();
    source.fail_fetches = true;
    let directory = RecordingDirectory::new();
    let events = directory.events();
    let (backend, ui) =
        PlaybackBackend::new(fast_config(), Box::new(source), Box::new(directory));
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    ui.select_channels(vec!["ramp".to_string()]);
    ui.set_run_mode(RunMode::FwdPlay);

    let stopped = wait_for(TIMEOUT, || {
        ui.run_mode().filter(|m| *m == RunMode::Stop)
    });
    assert_eq!(stopped, Some(RunMode::Stop));

    // Nothing was delivered along the way.
    let recorded = events.lock().unwrap();
    assert!(!recorded
        .iter()
        .any(|e| matches!(e, SinkEvent::Data { .. })));

    ui.quit();
    worker.join().unwrap();
}

#[test]
fn test_quit_releases_connection() {
    let (backend, ui) = PlaybackBackend::new(
        fast_config(),
        Box::new(archive_source()),
        Box::new(RecordingDirectory::new()),
    );
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    assert_eq!(wait_for(TIMEOUT, || ui.connection_status()), Some(true));

    ui.quit();
    worker.join().unwrap();

    // Shutdown publishes the final disconnected status.
    assert_eq!(ui.connection_status(), Some(false));
}

#[test]
fn test_selection_change_closes_dropped_sinks() {
    let directory = RecordingDirectory::new();
    let closed = directory.closed();
    let (backend, ui) = PlaybackBackend::new(
        fast_config(),
        Box::new(archive_source()),
        Box::new(directory),
    );
    let worker = std::thread::spawn(move || backend.run());

    ui.open_connection("sim://test");
    ui.select_channels(vec!["ramp".to_string(), "sine".to_string()]);
    assert_eq!(wait_for(TIMEOUT, || ui.connection_status()), Some(true));

    ui.select_channels(vec!["sine".to_string()]);
    let dropped = wait_for(TIMEOUT, || {
        let closed = closed.lock().unwrap();
        (!closed.is_empty()).then(|| closed.clone())
    });
    assert_eq!(dropped, Some(vec!["ramp".to_string()]));

    ui.quit();
    worker.join().unwrap();
}
