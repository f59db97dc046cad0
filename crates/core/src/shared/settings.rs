use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL, MAX_RECORDING_DURATION,
    RECOGNIZER_RESTART_DELAY,
};
use super::language::Language;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// User-level configuration, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub language: Language,
    pub request_timeout_secs: u64,
    pub max_recording_ms: u64,
    pub recognizer_restart_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            language: Language::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_recording_ms: MAX_RECORDING_DURATION.as_millis() as u64,
            recognizer_restart_delay_ms: RECOGNIZER_RESTART_DELAY.as_millis() as u64,
        }
    }
}

impl Settings {
    /// `<config dir>/Pronounce/settings.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Pronounce").join("settings.json"))
    }

    /// Loads from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads from `path`; a missing or malformed file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid settings at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Writes to the user config directory and returns the file written.
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        fs::write(path, json).map_err(|e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_millis(self.max_recording_ms)
    }

    pub fn recognizer_restart_delay(&self) -> Duration {
        Duration::from_millis(self.recognizer_restart_delay_ms)
    }
}
