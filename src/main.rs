//! Demo binary: drives the playback engine against the simulated source
//!
//! Runs a short scripted session (connect, list channels, jump around the
//! archive, follow live data) with every delivery logged through the
//! [`LogSinkDirectory`]. Useful for eyeballing the engine's behavior:
//!
//! ```sh
//! RUST_LOG=timescope=debug cargo run --features mock-source
//! ```

use anyhow::Result;
use std::thread;
use std::time::Duration;
use timescope::config::EngineConfig;
use timescope::engine::PlaybackBackend;
use timescope::sink::LogSinkDirectory;
use timescope::source::{SimulatedSource, WavePattern};
use timescope::types::RunMode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("timescope=info")),
        )
        .init();

    let config = EngineConfig::load_or_default();
    let mut source = SimulatedSource::new()
        .with_archive(1_000_000.0, 1_003_600.0)
        .with_sample_period(0.5)
        .with_channel(
            "beam/current",
            WavePattern::Sine {
                frequency: 0.05,
                amplitude: 120.0,
                offset: 200.0,
            },
        )
        .with_channel(
            "vac/pressure",
            WavePattern::Ramp {
                slope: -1e-9,
                offset: 2e-6,
            },
        );
    source.advance_per_read = 0.5;

    let (backend, ui) =
        PlaybackBackend::new(config, Box::new(source), Box::new(LogSinkDirectory));
    let worker = thread::spawn(move || backend.run());

    ui.open_connection("sim://local");
    ui.refresh_channels();
    ui.select_channels(vec!["beam/current".to_string(), "vac/pressure".to_string()]);
    ui.set_duration(30.0);

    ui.set_run_mode(RunMode::Bof);
    thread::sleep(Duration::from_millis(200));
    ui.set_run_mode(RunMode::AllData);
    thread::sleep(Duration::from_millis(200));
    ui.set_run_mode(RunMode::FwdPlay);
    thread::sleep(Duration::from_millis(500));
    ui.set_run_mode(RunMode::RealTime);
    thread::sleep(Duration::from_secs(2));

    if let Some(rate) = ui.update_rate() {
        tracing::info!("last reported rate: {}", rate);
    }
    if let Some(stats) = ui.source_stats() {
        tracing::info!(
            fetches = stats.successful_fetches,
            samples = stats.total_samples,
            avg_us = stats.avg_fetch_time_us(),
            "source statistics"
        );
    }

    ui.quit();
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    Ok(())
}
