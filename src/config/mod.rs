//! Configuration for the Timescope core
//!
//! This module handles:
//! - Engine runtime settings ([`EngineConfig`]), persisted as TOML in the
//!   platform data directory
//! - Session snapshots ([`SessionSnapshot`]) exchanged with the engine over
//!   the config rendezvous slot and persisted as JSON by the UI side
//!
//! # App Data Location
//!
//! - **Linux**: `~/.local/share/org.timescope.timescope/`
//! - **macOS**: `~/Library/Application Support/org.timescope.timescope/`
//! - **Windows**: `%APPDATA%\org.timescope.timescope\`

pub mod settings;

pub use settings::*;

use crate::error::{Result, ResultExt, TimescopeError};
use crate::types::{ChannelId, DisplayMode, TimeFormat, TimeWindow, WindowAnchor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "org.timescope.timescope";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        TimescopeError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            TimescopeError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

impl EngineConfig {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(TimescopeError::from)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&text)
            .map_err(|e| TimescopeError::Serialization(format!("Invalid settings file: {}", e)))
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Failed to load settings from {:?}: {}", path, e);
                }
                Self::default()
            }
        }
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| TimescopeError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }
}

/// Serializable snapshot of the engine's user-steerable state
///
/// Produced by the engine on `SaveConfig` and applied on `LoadConfig`, both
/// handed over the config rendezvous slot. The snapshot deliberately
/// excludes the authoritative run mode and speed: restoring a session never
/// resumes playback by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    /// Ordered channel selection
    pub channels: Vec<ChannelId>,
    /// The window at snapshot time
    pub window: TimeWindow,
    /// Which edge of the window the position readout tracks
    pub anchor: WindowAnchor,
    /// Time readout format
    pub time_format: TimeFormat,
    /// Fractional-second digits for readouts
    pub precision: usize,
    /// Plot or table presentation
    pub display_mode: DisplayMode,
}

impl SessionSnapshot {
    /// Load a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(TimescopeError::from)
            .with_context(|| format!("reading snapshot from {}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| TimescopeError::Serialization(format!("Invalid snapshot file: {}", e)))
    }

    /// Save a snapshot as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| TimescopeError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let mut config = EngineConfig::default();
        config.poll_interval_ms = 40;
        config.source_address = "ts://archive.example:7700".to_string();
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let snapshot = SessionSnapshot {
            channels: vec!["beam/current".to_string(), "vac/pressure".to_string()],
            window: TimeWindow::new(1000.0, 30.0),
            anchor: WindowAnchor::End,
            time_format: TimeFormat::TimeOfDay,
            precision: 1,
            display_mode: DisplayMode::Table,
        };
        snapshot.save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_missing_settings_is_error() {
        let err = EngineConfig::load("/nonexistent/settings.toml").unwrap_err();
        // The failure names the file it was trying to read.
        assert!(err.to_string().contains("/nonexistent/settings.toml"));
    }
}
